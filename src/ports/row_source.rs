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

//! Port for the row-oriented files an import reads from.

use crate::domain::errors::Result;
use crate::domain::requests::SourceFormat;
use std::path::Path;

/// One input row.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    /// Delimited text or spreadsheet row, addressed by column index.
    Positional(Vec<String>),
    /// Structured record, addressed by field name.
    Keyed(serde_json::Map<String, serde_json::Value>),
}

/// A stream of input rows. An `Err` item ends the import.
pub trait RowSource: Iterator<Item = Result<SourceRow>> + Send {
    /// Number of rows, when known up front.
    fn total_hint(&self) -> Option<u64> {
        None
    }
}

pub trait SourceFactory: Send + Sync {
    fn open(&self, path: &Path, format: SourceFormat, delimiter: Option<char>)
        -> Result<Box<dyn RowSource>>;
}
