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

//! # Row Sink Port
//!
//! The contract for the format-specific writer a dump streams into.

use crate::domain::entities::{ColumnMeta, Value};
use crate::domain::errors::Result;
use crate::domain::requests::{DumpFormat, FieldType};
use std::path::PathBuf;

/// Everything a factory needs to open the destination of one dump.
#[derive(Debug, Clone)]
pub struct SinkSpec {
    pub format: DumpFormat,
    pub dir: PathBuf,
    pub file_name: String,
    pub tables: Vec<String>,
    pub field_types: Vec<FieldType>,
    pub identifier_quote: String,
    pub compress: bool,
}

/// Consumer of table structure, headers and row tuples.
///
/// Calls for one table are bracketed by `begin_table` and `end_table`;
/// `write_rows` may be called once per page.
pub trait RowSink: Send {
    fn begin_table(&mut self, table: &str) -> Result<()>;

    fn write_structure(&mut self, table: &str, drop_sql: Option<&str>, ddl: Option<&str>)
        -> Result<()>;

    /// Total rows the table is about to produce.
    fn note_total(&mut self, _table: &str, _total: u64) -> Result<()> {
        Ok(())
    }

    fn begin_page(&mut self, _table: &str, _offset: u64, _len: u64) -> Result<()> {
        Ok(())
    }

    fn write_rows(&mut self, table: &str, columns: &[ColumnMeta], rows: &[Vec<Value>])
        -> Result<()>;

    /// Writes an inline marker for a table that failed part-way.
    fn write_error(&mut self, table: &str, message: &str) -> Result<()>;

    fn end_table(&mut self, table: &str) -> Result<()>;

    /// Flushes and closes the destination.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Opens the destination of a dump. Failure here is fatal to the task.
pub trait SinkFactory: Send + Sync {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn RowSink>>;
}
