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

//! # Table Dump
//!
//! Exports structure and/or data of a list of tables into one `RowSink`.
//!
//! Data is read page by page: a `COUNT(*)` first, then windows of
//! `page_size` rows addressed by the request's paging clause. A table that
//! fails is marked inline in the output and reported as a failed
//! `TableRecord`; the dump then moves on to the next table. Only a
//! destination that cannot be opened (or stops accepting writes) ends the
//! task.

use crate::application::worker::{Worker, WorkerContext};
use crate::config::EngineConfig;
use crate::domain::entities::{Outcome, ResultRecord, TableRecord, TaskKind, Value, PROGRESS_MAX};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::{DataSourceDescriptor, DumpMode, DumpRequest};
use crate::domain::sql_text::{render_page_clause, render_table_template};
use crate::ports::row_sink::{RowSink, SinkFactory, SinkSpec};
use crate::ports::session_port::DatabaseSession;
use log::{info, warn};
use std::sync::Arc;

const DEFAULT_PAGE_SQL: &str = "OFFSET {1} ROWS FETCH NEXT {2} ROWS ONLY";
const DEFAULT_IDENTIFIER_QUOTE: &str = "\"";

pub struct DumpWorker {
    request: DumpRequest,
    page_size: u64,
    sinks: Arc<dyn SinkFactory>,
}

/// Position of the dump, used to compute overall progress.
struct Cursor {
    table_index: u64,
    table_count: u64,
}

impl Cursor {
    fn progress(&self, done: u64, total: u64) -> u32 {
        if total == 0 {
            return self.after_table();
        }
        let num = (self.table_index * total + done) as u128 * PROGRESS_MAX as u128;
        let den = (self.table_count * total) as u128;
        (num / den) as u32
    }

    fn after_table(&self) -> u32 {
        ((self.table_index + 1) * PROGRESS_MAX as u64 / self.table_count) as u32
    }
}

impl DumpWorker {
    pub fn new(request: DumpRequest, engine: &EngineConfig, sinks: Arc<dyn SinkFactory>) -> Self {
        Self {
            request,
            page_size: engine.page_size.max(1),
            sinks,
        }
    }

    fn sink_spec(&self) -> SinkSpec {
        SinkSpec {
            format: self.request.format,
            dir: self.request.path.clone(),
            file_name: self.request.file_name.clone(),
            tables: self.request.tables.clone(),
            field_types: self.request.field_types.clone(),
            identifier_quote: self
                .request
                .identifier_quote
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTIFIER_QUOTE.to_string()),
            compress: self.request.compress,
        }
    }

    fn dump_structure(
        &self,
        session: &mut dyn DatabaseSession,
        sink: &mut dyn RowSink,
        table: &str,
    ) -> Result<()> {
        let drop_sql = self
            .request
            .drop_table_sql
            .as_deref()
            .map(|t| render_table_template(t, table));
        let ddl = match self.request.ddl_sql.as_deref() {
            Some(template) => {
                let out = session.query(&render_table_template(template, table))?;
                let ddl = out
                    .rows
                    .first()
                    .and_then(|row| row.get(1))
                    .and_then(Value::to_text)
                    .ok_or_else(|| TaskError::Execution(format!("no DDL returned for {}", table)))?;
                Some(ddl)
            }
            None => None,
        };
        sink.write_structure(table, drop_sql.as_deref(), ddl.as_deref())
    }

    fn dump_data(
        &self,
        session: &mut dyn DatabaseSession,
        sink: &mut dyn RowSink,
        ctx: &WorkerContext,
        cursor: &Cursor,
        table: &str,
    ) -> Result<u64> {
        let total = session
            .query(&format!("SELECT COUNT(*) FROM {}", table))?
            .scalar()
            .and_then(Value::as_u64)
            .ok_or_else(|| TaskError::Execution(format!("cannot count rows of {}", table)))?;
        sink.note_total(table, total)?;

        let template = self.request.page_sql.as_deref().unwrap_or(DEFAULT_PAGE_SQL);
        let mut offset = 0u64;
        let mut exported = 0u64;
        while offset < total {
            ctx.checkpoint()?;
            let len = self.page_size.min(total - offset);
            let sql = format!(
                "SELECT * FROM {} {}",
                table,
                render_page_clause(template, offset, len)
            );
            let page = session.query(&sql)?;
            sink.begin_page(table, offset, len)?;
            sink.write_rows(table, &page.columns, &page.rows)?;
            exported += page.rows.len() as u64;
            offset += len;
            ctx.set_progress(cursor.progress(offset, total));
        }
        Ok(exported)
    }

    fn dump_table(
        &self,
        session: &mut dyn DatabaseSession,
        sink: &mut dyn RowSink,
        ctx: &WorkerContext,
        cursor: &Cursor,
        table: &str,
        mode: DumpMode,
    ) -> Result<u64> {
        sink.begin_table(table)?;
        if mode.includes_structure() {
            self.dump_structure(session, sink, table)?;
        }
        let rows = if mode.includes_data() {
            self.dump_data(session, sink, ctx, cursor, table)?
        } else {
            0
        };
        sink.end_table(table)?;
        Ok(rows)
    }
}

impl Worker for DumpWorker {
    fn kind(&self) -> TaskKind {
        TaskKind::Dump
    }

    fn label(&self) -> String {
        self.request.datasource.name.clone()
    }

    fn transactional(&self) -> bool {
        false
    }

    fn datasource(&self) -> &DataSourceDescriptor {
        &self.request.datasource
    }

    fn run(&mut self, session: &mut dyn DatabaseSession, ctx: &WorkerContext) -> Result<String> {
        let mut sink = self
            .sinks
            .open(&self.sink_spec())
            .map_err(|e| TaskError::Fatal(format!("cannot open dump destination: {}", e)))?;

        let mode = self.request.effective_mode();
        let table_count = self.request.tables.len() as u64;
        let mut failed = 0usize;

        for (i, table) in self.request.tables.iter().enumerate() {
            ctx.checkpoint()?;
            ctx.set_message(format!("Dump table: {}", table));
            let cursor = Cursor {
                table_index: i as u64,
                table_count,
            };

            let record = match self.dump_table(session, sink.as_mut(), ctx, &cursor, table, mode) {
                Ok(rows) => {
                    info!("Dumped table {} ({} rows)", table, rows);
                    TableRecord {
                        table: table.clone(),
                        status: Outcome::Success,
                        rows,
                        message: format!("{} rows exported", rows),
                    }
                }
                Err(TaskError::Cancelled) => return Err(TaskError::Cancelled),
                Err(e) => {
                    warn!("Dump of table {} failed: {}", table, e);
                    failed += 1;
                    sink.write_error(table, &e.to_string())
                        .and_then(|_| sink.end_table(table))
                        .map_err(|se| TaskError::Fatal(format!("dump destination failed: {}", se)))?;
                    TableRecord {
                        table: table.clone(),
                        status: Outcome::Fail,
                        rows: 0,
                        message: e.to_string(),
                    }
                }
            };
            ctx.push(ResultRecord::Table(record))?;
            ctx.set_progress(cursor.after_table());
        }

        sink.finish()
            .map_err(|e| TaskError::Fatal(format!("cannot finish dump destination: {}", e)))?;

        Ok(if failed == 0 {
            format!("Dumped {} tables", table_count)
        } else {
            format!("Dumped {} tables, {} failed", table_count, failed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::result_queue::result_queue;
    use crate::application::task::TaskShared;
    use crate::application::test_support::{descriptor, MockDb, RecordingSinkFactory};
    use crate::domain::entities::TaskId;
    use crate::domain::requests::DumpFormat;

    fn request(tables: &[&str], mode: DumpMode, format: DumpFormat) -> DumpRequest {
        DumpRequest {
            datasource: descriptor(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            mode,
            format,
            path: "/tmp".into(),
            file_name: "dump".into(),
            drop_table_sql: Some("DROP TABLE {table}".into()),
            ddl_sql: Some("SHOW CREATE TABLE {table}".into()),
            page_sql: None,
            field_types: Vec::new(),
            identifier_quote: None,
            compress: false,
        }
    }

    fn setup() -> (Arc<TaskShared>, WorkerContext, crate::application::result_queue::ResultReceiver) {
        let shared = Arc::new(TaskShared::new(TaskId::new(), TaskKind::Dump, "x".into(), false));
        let (tx, rx) = result_queue(64, shared.cancel_flag());
        (Arc::clone(&shared), WorkerContext::new(shared, tx), rx)
    }

    #[test]
    fn test_pages_and_progress() {
        let db = MockDb::new().with_table("T1", 2500);
        let (shared, ctx, rx) = setup();
        let sinks = Arc::new(RecordingSinkFactory::new().with_probe(Arc::clone(&shared)));
        let mut w = DumpWorker::new(
            request(&["T1"], DumpMode::Data, DumpFormat::Csv),
            &EngineConfig::default(),
            sinks.clone(),
        );
        let mut session = db.session();
        w.run(session.as_mut(), &ctx).unwrap();

        let pages: Vec<String> = db
            .state()
            .executed
            .iter()
            .filter(|s| s.starts_with("SELECT * FROM T1"))
            .cloned()
            .collect();
        assert_eq!(
            pages,
            vec![
                "SELECT * FROM T1 OFFSET 0 ROWS FETCH NEXT 1000 ROWS ONLY",
                "SELECT * FROM T1 OFFSET 1000 ROWS FETCH NEXT 1000 ROWS ONLY",
                "SELECT * FROM T1 OFFSET 2000 ROWS FETCH NEXT 500 ROWS ONLY",
            ]
        );

        // Progress seen by the sink at each page start, before the page is counted.
        let seen = sinks.progress_seen();
        assert_eq!(seen, vec![0, 4000, 8000]);
        assert!(seen.iter().all(|p| *p < PROGRESS_MAX));
        assert_eq!(shared.snapshot().progress, PROGRESS_MAX);

        match &rx.drain()[..] {
            [ResultRecord::Table(t)] => {
                assert_eq!(t.rows, 2500);
                assert_eq!(t.status, Outcome::Success);
            }
            other => panic!("unexpected records {:?}", other),
        }
    }

    #[test]
    fn test_custom_page_template() {
        let db = MockDb::new().with_table("T1", 3);
        let (_shared, ctx, _rx) = setup();
        let mut req = request(&["T1"], DumpMode::Data, DumpFormat::Csv);
        req.page_sql = Some("LIMIT {2} OFFSET {1}".into());
        let engine = EngineConfig {
            page_size: 2,
            ..EngineConfig::default()
        };
        let sinks = Arc::new(RecordingSinkFactory::new());
        let mut w = DumpWorker::new(req, &engine, sinks.clone());
        let mut session = db.session();
        w.run(session.as_mut(), &ctx).unwrap();

        let state = db.state();
        let pages: Vec<&String> = state
            .executed
            .iter()
            .filter(|s| s.starts_with("SELECT * FROM T1"))
            .collect();
        assert_eq!(
            pages,
            vec!["SELECT * FROM T1 LIMIT 2 OFFSET 0", "SELECT * FROM T1 LIMIT 1 OFFSET 2"]
        );
        assert!(sinks.events().contains(&"rows:T1:1".to_string()));
    }

    #[test]
    fn test_failed_table_is_marked_and_skipped() {
        let db = MockDb::new()
            .with_table("GOOD", 3)
            .fail_on("FROM BAD");
        let (_shared, ctx, rx) = setup();
        let sinks = Arc::new(RecordingSinkFactory::new());
        let mut w = DumpWorker::new(
            request(&["BAD", "GOOD"], DumpMode::Both, DumpFormat::Sql),
            &EngineConfig::default(),
            sinks.clone(),
        );
        let mut session = db.session();
        let message = w.run(session.as_mut(), &ctx).unwrap();
        assert!(message.contains("1 failed"));

        let events = sinks.events();
        assert!(events.iter().any(|e| e.starts_with("error:BAD")));
        assert!(events.contains(&"structure:GOOD:drop:ddl".to_string()));
        assert!(events.contains(&"rows:GOOD:3".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("finish"));

        let records = rx.drain();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], ResultRecord::Table(t) if t.status == Outcome::Fail));
        assert!(matches!(&records[1], ResultRecord::Table(t) if t.status == Outcome::Success));
    }

    #[test]
    fn test_structure_only_skips_count() {
        let db = MockDb::new().with_table("T1", 10);
        let (_shared, ctx, _rx) = setup();
        let sinks = Arc::new(RecordingSinkFactory::new());
        let mut w = DumpWorker::new(
            request(&["T1"], DumpMode::Structure, DumpFormat::Sql),
            &EngineConfig::default(),
            sinks.clone(),
        );
        let mut session = db.session();
        w.run(session.as_mut(), &ctx).unwrap();
        assert!(!db.state().executed.iter().any(|s| s.contains("COUNT(*)")));
        assert!(sinks.events().contains(&"structure:T1:drop:ddl".to_string()));
    }

    #[test]
    fn test_unopenable_destination_is_fatal() {
        let db = MockDb::new().with_table("T1", 1);
        let (_shared, ctx, _rx) = setup();
        let sinks = Arc::new(RecordingSinkFactory::new().failing_open());
        let mut w = DumpWorker::new(
            request(&["T1"], DumpMode::Data, DumpFormat::Json),
            &EngineConfig::default(),
            sinks,
        );
        let mut session = db.session();
        assert!(matches!(w.run(session.as_mut(), &ctx), Err(TaskError::Fatal(_))));
        assert!(db.state().executed.is_empty());
    }

    #[test]
    fn test_cursor_progress() {
        let c = Cursor {
            table_index: 1,
            table_count: 2,
        };
        assert_eq!(c.progress(0, 100), 5000);
        assert_eq!(c.progress(100, 100), PROGRESS_MAX);
        assert_eq!(c.progress(0, 0), PROGRESS_MAX);
    }
}
