// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Database Task Engine
//!
//! Runs long database operations (multi-statement SQL, table dumps, file
//! imports) on their own threads and lets a client poll for incremental
//! results, stop a task, or commit/rollback the transaction a task left open.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` and `application` hold the engine, `ports` the traits for the
//! database, output writers and input readers, and `infrastructure` the
//! Oracle and file-based implementations.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
