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

//! SQL script output: one file for all tables, with `---` comment markers
//! around each section and one `INSERT` per row.

use crate::domain::entities::{ColumnMeta, Value};
use crate::domain::errors::Result;
use crate::domain::requests::FieldType;
use crate::domain::sql_text::{
    catalog_for, format_literal, insert_prefix, is_unquoted_catalog, quote_identifier,
};
use crate::infrastructure::sinks::{output_path, Output};
use crate::ports::row_sink::{RowSink, SinkSpec};
use std::io::Write;

pub struct SqlFileSink {
    out: Output,
    quote: String,
    field_types: Vec<FieldType>,
}

impl SqlFileSink {
    pub fn create(spec: &SinkSpec) -> Result<Self> {
        let path = output_path(spec, None, "sql");
        Ok(Self {
            out: Output::create(&path, spec.compress)?,
            quote: spec.identifier_quote.clone(),
            field_types: spec.field_types.clone(),
        })
    }

    fn insert_statement(&self, prefix: &str, unquoted: &[bool], row: &[Value]) -> String {
        let values: Vec<String> = row
            .iter()
            .zip(unquoted)
            .map(|(v, u)| format_literal(v, *u))
            .collect();
        format!("{}{});", prefix, values.join(","))
    }
}

impl RowSink for SqlFileSink {
    fn begin_table(&mut self, table: &str) -> Result<()> {
        writeln!(self.out, "--- Dump Table:{}---", table)?;
        Ok(())
    }

    fn write_structure(&mut self, table: &str, drop_sql: Option<&str>, ddl: Option<&str>) -> Result<()> {
        writeln!(self.out, "--- Dump Table Structure:{}---", table)?;
        for sql in [drop_sql, ddl].into_iter().flatten() {
            writeln!(self.out, "{};", sql.trim_end().trim_end_matches(';'))?;
        }
        Ok(())
    }

    fn note_total(&mut self, table: &str, total: u64) -> Result<()> {
        writeln!(self.out, "--- Dump Table Data:{}---", table)?;
        writeln!(self.out, "--- Total:{}---", total)?;
        Ok(())
    }

    fn begin_page(&mut self, _table: &str, offset: u64, len: u64) -> Result<()> {
        writeln!(self.out, "--- Page:{},{}---", offset, len)?;
        Ok(())
    }

    fn write_rows(&mut self, table: &str, columns: &[ColumnMeta], rows: &[Vec<Value>]) -> Result<()> {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let prefix = insert_prefix(&quote_identifier(table, &self.quote), &names, &self.quote);
        let unquoted: Vec<bool> = columns
            .iter()
            .map(|c| is_unquoted_catalog(catalog_for(&c.type_name, &self.field_types)))
            .collect();
        for row in rows {
            let stmt = self.insert_statement(&prefix, &unquoted, row);
            writeln!(self.out, "{}", stmt)?;
        }
        Ok(())
    }

    fn write_error(&mut self, table: &str, message: &str) -> Result<()> {
        writeln!(self.out, "--- Error:{}---", table)?;
        writeln!(self.out, "---{}---", message.replace('\n', " "))?;
        Ok(())
    }

    fn end_table(&mut self, _table: &str) -> Result<()> {
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.out.finish()
    }
}
