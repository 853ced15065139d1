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

pub mod csv_source;
pub mod json_source;
pub mod xlsx_source;

use crate::domain::errors::Result;
use crate::domain::requests::SourceFormat;
use crate::ports::row_source::{RowSource, SourceFactory};
use std::path::Path;

/// Reads import rows from local files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSourceFactory;

impl SourceFactory for FileSourceFactory {
    fn open(&self, path: &Path, format: SourceFormat, delimiter: Option<char>) -> Result<Box<dyn RowSource>> {
        Ok(match format {
            SourceFormat::Csv => Box::new(csv_source::CsvRowSource::open(path, delimiter)?),
            SourceFormat::Json => Box::new(json_source::JsonRowSource::open(path)?),
            SourceFormat::Xlsx => Box::new(xlsx_source::XlsxRowSource::open(path)?),
        })
    }
}
