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

//! File import into a single table.
//!
//! Always transactional: the rows are inserted in batches inside one
//! transaction that stays open until an explicit commit or rollback.

use crate::application::worker::{Worker, WorkerContext};
use crate::config::EngineConfig;
use crate::domain::entities::{ImportRecord, ResultRecord, TaskKind, PROGRESS_MAX};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::{ColumnMapping, DataSourceDescriptor, ImportRequest, SourceFormat};
use crate::domain::sql_text::{import_literal, insert_prefix, quote_identifier, render_table_template};
use crate::ports::row_source::{SourceFactory, SourceRow};
use crate::ports::session_port::DatabaseSession;
use log::{debug, info};
use std::sync::Arc;

const DEFAULT_IDENTIFIER_QUOTE: &str = "\"";

pub struct ImportWorker {
    request: ImportRequest,
    format: SourceFormat,
    batch_size: usize,
    sources: Arc<dyn SourceFactory>,
}

impl ImportWorker {
    pub fn new(
        request: ImportRequest,
        engine: &EngineConfig,
        sources: Arc<dyn SourceFactory>,
    ) -> Result<Self> {
        let format = request.source_format()?;
        Ok(Self {
            request,
            format,
            batch_size: engine.import_batch_size.max(1),
            sources,
        })
    }

    fn quote(&self) -> &str {
        self.request
            .identifier_quote
            .as_deref()
            .unwrap_or(DEFAULT_IDENTIFIER_QUOTE)
    }

    fn clear_sql(&self) -> String {
        match self.request.clear_table_sql.as_deref() {
            Some(template) => render_table_template(template, &self.request.table),
            None => format!(
                "DELETE FROM {}",
                quote_identifier(&self.request.table, self.quote())
            ),
        }
    }

    fn cell(row: &SourceRow, mapping: &ColumnMapping) -> Option<String> {
        match row {
            SourceRow::Positional(cells) => {
                Some(cells.get(mapping.index).cloned().unwrap_or_default())
            }
            SourceRow::Keyed(fields) => match fields.get(&mapping.name) {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            },
        }
    }

    fn build_insert(&self, prefix: &str, row: &SourceRow) -> Result<String> {
        let values = self
            .request
            .mapping
            .iter()
            .map(|m| import_literal(Self::cell(row, m).as_deref(), m.catalog.as_deref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}{})", prefix, values.join(",")))
    }
}

impl Worker for ImportWorker {
    fn kind(&self) -> TaskKind {
        TaskKind::Import
    }

    fn label(&self) -> String {
        self.request.datasource.name.clone()
    }

    fn transactional(&self) -> bool {
        true
    }

    fn datasource(&self) -> &DataSourceDescriptor {
        &self.request.datasource
    }

    fn run(&mut self, session: &mut dyn DatabaseSession, ctx: &WorkerContext) -> Result<String> {
        let source = self
            .sources
            .open(&self.request.path, self.format, self.request.delimiter)
            .map_err(|e| {
                TaskError::Fatal(format!(
                    "cannot open import source {}: {}",
                    self.request.path.display(),
                    e
                ))
            })?;
        let total = source.total_hint();

        if self.request.clear {
            ctx.set_message(format!("Clear table: {}", self.request.table));
            session.execute(&self.clear_sql())?;
        }

        let columns: Vec<&str> = self.request.mapping.iter().map(|m| m.name.as_str()).collect();
        let prefix = insert_prefix(
            &quote_identifier(&self.request.table, self.quote()),
            &columns,
            self.quote(),
        );

        let mut batch: Vec<String> = Vec::with_capacity(self.batch_size);
        let mut rows = 0u64;
        let mut batches = 0u64;

        for (n, item) in source.enumerate() {
            ctx.checkpoint()?;
            let row = item.map_err(|e| TaskError::Execution(format!("row {}: {}", n + 1, e)))?;
            let sql = self
                .build_insert(&prefix, &row)
                .map_err(|e| TaskError::Execution(format!("row {}: {}", n + 1, e)))?;
            batch.push(sql);

            if batch.len() >= self.batch_size {
                batches += 1;
                ctx.set_message(format!("Insert batch {}", batches));
                session.execute_batch(&batch)?;
                rows += batch.len() as u64;
                batch.clear();
                if let Some(total) = total.filter(|t| *t > 0) {
                    ctx.set_progress((rows.min(total) * PROGRESS_MAX as u64 / total) as u32);
                }
                debug!("Flushed batch {} ({} rows so far)", batches, rows);
            }
        }
        if !batch.is_empty() {
            batches += 1;
            session.execute_batch(&batch)?;
            rows += batch.len() as u64;
        }

        info!("Imported {} rows into {} in {} batches", rows, self.request.table, batches);
        ctx.push(ResultRecord::Import(ImportRecord {
            table: self.request.table.clone(),
            rows,
            batches,
        }))?;
        Ok(format!("Imported {} rows into {}", rows, self.request.table))
    }
}
