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

use crate::domain::errors::{Result, TaskError};
use crate::ports::row_source::{RowSource, SourceRow};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;

/// Rows of the first worksheet after its header row, as positional text cells.
pub struct XlsxRowSource {
    total: u64,
    rows: std::vec::IntoIter<Result<SourceRow>>,
}

fn cell_text(cell: &Data) -> std::result::Result<String, String> {
    Ok(match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => return Err(format!("cell error {:?}", e)),
    })
}

fn to_row(cells: &[Data]) -> Result<SourceRow> {
    cells
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            cell_text(cell).map_err(|e| TaskError::Source(format!("column {}: {}", col + 1, e)))
        })
        .collect::<Result<Vec<String>>>()
        .map(SourceRow::Positional)
}

impl XlsxRowSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| TaskError::Source(format!("{}: {}", path.display(), e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TaskError::Source(format!("{}: workbook has no sheets", path.display())))?
            .map_err(|e| TaskError::Source(format!("{}: {}", path.display(), e)))?;

        let rows: Vec<Result<SourceRow>> = range.rows().skip(1).map(to_row).collect();
        Ok(Self {
            total: rows.len() as u64,
            rows: rows.into_iter(),
        })
    }
}

impl Iterator for XlsxRowSource {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl RowSource for XlsxRowSource {
    fn total_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
