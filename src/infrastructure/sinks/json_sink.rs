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
use log::warn;
use serde_json::{json, Map};
use std::io::Write;

/// A JSON array of row objects per table, keyed by column name.
pub struct JsonFileSink {
    spec: SinkSpec,
    current: Option<Output>,
    first: bool,
}

impl JsonFileSink {
    pub fn new(spec: &SinkSpec) -> Self {
        Self {
            spec: spec.clone(),
            current: None,
            first: true,
        }
    }

    fn element(&mut self, table: &str, value: &serde_json::Value) -> Result<()> {
        let first = self.first;
        let out = self
            .current
            .as_mut()
            .ok_or_else(|| TaskError::Sink(format!("no open output for table {}", table)))?;
        if !first {
            out.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut *out, value)?;
        self.first = false;
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut out) = self.current.take() {
            out.write_all(b"\n]\n")?;
            out.finish()?;
        }
        Ok(())
    }
}

impl RowSink for JsonFileSink {
    fn begin_table(&mut self, table: &str) -> Result<()> {
        self.close_current()?;
        let path = output_path(&self.spec, Some(table), "json");
        let mut out = Output::create(&path, self.spec.compress)?;
        out.write_all(b"[\n")?;
        self.current = Some(out);
        self.first = true;
        Ok(())
    }

    fn write_structure(&mut self, _table: &str, _drop_sql: Option<&str>, _ddl: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn write_rows(&mut self, table: &str, columns: &[ColumnMeta], rows: &[Vec<Value>]) -> Result<()> {
        for row in rows {
            let mut obj = Map::with_capacity(columns.len());
            for (col, v) in columns.iter().zip(row) {
                obj.insert(col.name.clone(), serde_json::to_value(v)?);
            }
            self.element(table, &serde_json::Value::Object(obj))?;
        }
        Ok(())
    }

    fn write_error(&mut self, table: &str, message: &str) -> Result<()> {
        if self.current.is_none() {
            warn!("No JSON output open for failed table {}", table);
            return Ok(());
        }
        self.element(table, &json!({ "error": message, "table": table }))
    }

    fn end_table(&mut self, _table: &str) -> Result<()> {
        self.close_current()
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.close_current()
    }
}
