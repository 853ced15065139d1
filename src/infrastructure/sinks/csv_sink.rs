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
use crate::infrastructure::sinks::{output_path, Output};
use crate::ports::row_sink::{RowSink, SinkSpec};
use csv::{QuoteStyle, Writer, WriterBuilder};
use log::warn;

/// Delimited text, one file per table. Binary cells are base64, NULL is empty.
pub struct CsvFileSink {
    spec: SinkSpec,
    current: Option<Writer<Output>>,
    header_written: bool,
}

impl CsvFileSink {
    pub fn new(spec: &SinkSpec) -> Self {
        Self {
            spec: spec.clone(),
            current: None,
            header_written: false,
        }
    }

    fn writer(&mut self, table: &str) -> Result<&mut Writer<Output>> {
        self.current
            .as_mut()
            .ok_or_else(|| TaskError::Sink(format!("no open output for table {}", table)))
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(wtr) = self.current.take() {
            let out = wtr
                .into_inner()
                .map_err(|e| TaskError::Sink(e.to_string()))?;
            out.finish()?;
        }
        Ok(())
    }
}

impl RowSink for CsvFileSink {
    fn begin_table(&mut self, table: &str) -> Result<()> {
        self.close_current()?;
        let path = output_path(&self.spec, Some(table), "csv");
        let out = Output::create(&path, self.spec.compress)?;
        self.current = Some(
            WriterBuilder::new()
                .flexible(true)
                .quote_style(QuoteStyle::Necessary)
                .from_writer(out),
        );
        self.header_written = false;
        Ok(())
    }

    fn write_structure(&mut self, _table: &str, _drop_sql: Option<&str>, _ddl: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn write_rows(&mut self, table: &str, columns: &[ColumnMeta], rows: &[Vec<Value>]) -> Result<()> {
        let write_header = !self.header_written;
        let wtr = self.writer(table)?;
        if write_header {
            wtr.write_record(columns.iter().map(|c| c.name.as_str()))?;
        }
        for row in rows {
            wtr.write_record(row.iter().map(|v| v.to_text().unwrap_or_default()))?;
        }
        self.header_written = true;
        Ok(())
    }

    fn write_error(&mut self, table: &str, message: &str) -> Result<()> {
        match self.current.as_mut() {
            Some(wtr) => {
                wtr.write_record([format!("ERROR: {}", message)])?;
                Ok(())
            }
            None => {
                warn!("No CSV output open for failed table {}", table);
                Ok(())
            }
        }
    }

    fn end_table(&mut self, _table: &str) -> Result<()> {
        self.close_current()
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.close_current()
    }
}
