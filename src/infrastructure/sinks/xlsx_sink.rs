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

use crate::domain::entities::{ColumnMeta, Value};
use crate::domain::errors::{Result, TaskError};
use crate::ports::row_sink::{RowSink, SinkSpec};
use log::{info, warn};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::collections::HashSet;

const MAX_SHEET_NAME: usize = 31;
/// Largest integer an xlsx number cell holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

enum SheetRow {
    Cells(Vec<Value>),
    Error(String),
}

struct Sheet {
    name: String,
    header: Option<Vec<String>>,
    rows: Vec<SheetRow>,
}

/// One workbook per dump, one worksheet per table. The workbook is written
/// in `finish`; `compress` does not apply since xlsx is already zipped.
pub struct XlsxFileSink {
    spec: SinkSpec,
    sheets: Vec<Sheet>,
    used_names: HashSet<String>,
}

fn sheet_err(e: XlsxError) -> TaskError {
    TaskError::Sink(format!("spreadsheet: {}", e))
}

impl XlsxFileSink {
    pub fn new(spec: &SinkSpec) -> Self {
        Self {
            spec: spec.clone(),
            sheets: Vec::new(),
            used_names: HashSet::new(),
        }
    }

    /// Worksheet names are at most 31 characters and may not contain `[]:*?/\`.
    fn sheet_name(&mut self, table: &str) -> String {
        let base: String = table
            .chars()
            .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
            .take(MAX_SHEET_NAME)
            .collect();
        let base = base.trim_matches('\'').to_string();
        let base = if base.is_empty() { "Sheet".to_string() } else { base };

        let mut name = base.clone();
        let mut n = 1;
        while !self.used_names.insert(name.to_lowercase()) {
            n += 1;
            let suffix = format!("_{}", n);
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.len());
            name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        }
        name
    }

    fn current(&mut self, table: &str) -> Result<&mut Sheet> {
        self.sheets
            .last_mut()
            .ok_or_else(|| TaskError::Sink(format!("no open sheet for table {}", table)))
    }
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &Value) -> std::result::Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        Value::Int(i) if i.unsigned_abs() <= MAX_EXACT_INT => {
            ws.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) if f.is_finite() => {
            ws.write_number(row, col, *f)?;
        }
        other => {
            ws.write_string(row, col, &other.to_text().unwrap_or_default())?;
        }
    }
    Ok(())
}

fn write_sheet(ws: &mut Worksheet, sheet: &Sheet) -> std::result::Result<(), XlsxError> {
    ws.set_name(sheet.name.as_str())?;
    let mut row: u32 = 0;
    if let Some(header) = &sheet.header {
        for (col, name) in header.iter().enumerate() {
            ws.write_string(row, col as u16, name.as_str())?;
        }
        row += 1;
    }
    for line in &sheet.rows {
        match line {
            SheetRow::Cells(cells) => {
                for (col, value) in cells.iter().enumerate() {
                    write_cell(ws, row, col as u16, value)?;
                }
            }
            SheetRow::Error(message) => {
                ws.write_string(row, 0, &format!("ERROR: {}", message))?;
            }
        }
        row += 1;
    }
    Ok(())
}

impl RowSink for XlsxFileSink {
    fn begin_table(&mut self, table: &str) -> Result<()> {
        let name = self.sheet_name(table);
        self.sheets.push(Sheet {
            name,
            header: None,
            rows: Vec::new(),
        });
        Ok(())
    }

    fn write_structure(&mut self, _table: &str, _drop_sql: Option<&str>, _ddl: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn write_rows(&mut self, table: &str, columns: &[ColumnMeta], rows: &[Vec<Value>]) -> Result<()> {
        let sheet = self.current(table)?;
        if sheet.header.is_none() {
            sheet.header = Some(columns.iter().map(|c| c.name.clone()).collect());
        }
        sheet.rows.extend(rows.iter().cloned().map(SheetRow::Cells));
        Ok(())
    }

    fn write_error(&mut self, table: &str, message: &str) -> Result<()> {
        match self.sheets.last_mut() {
            Some(sheet) => sheet.rows.push(SheetRow::Error(message.to_string())),
            None => warn!("No sheet open for failed table {}", table),
        }
        Ok(())
    }

    fn end_table(&mut self, _table: &str) -> Result<()> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let path = self.spec.dir.join(format!("{}.xlsx", self.spec.file_name));
        let mut workbook = Workbook::new();
        for sheet in &self.sheets {
            write_sheet(workbook.add_worksheet(), sheet).map_err(sheet_err)?;
        }
        if self.sheets.is_empty() {
            workbook.add_worksheet();
        }
        workbook.save(&path).map_err(sheet_err)?;
        info!("Wrote {} sheets to {}", self.sheets.len(), path.display());
        Ok(())
    }
}
