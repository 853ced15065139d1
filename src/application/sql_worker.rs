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

//! Multi-statement SQL execution.

use crate::application::worker::{Worker, WorkerContext};
use crate::config::EngineConfig;
use crate::domain::entities::{
    ColumnMeta, Outcome, ResultRecord, StatementRecord, TaskKind, Value, PROGRESS_MAX,
};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::{DataSourceDescriptor, SqlRequest};
use crate::domain::sql_text::{split_statements, truncate_label};
use crate::ports::session_port::{DatabaseSession, ExecOutcome};
use log::{debug, warn};

pub struct SqlWorker {
    request: SqlRequest,
    statements: Vec<String>,
    label: String,
}

impl SqlWorker {
    pub fn new(request: SqlRequest, engine: &EngineConfig) -> Self {
        let statements = split_statements(&request.sql, &request.delimiter);
        let label = truncate_label(&request.sql, engine.label_max_chars);
        Self {
            request,
            statements,
            label,
        }
    }

    #[cfg(test)]
    pub(crate) fn statements(&self) -> &[String] {
        &self.statements
    }
}

fn success_record(index: usize, sql: &str, outcome: ExecOutcome) -> StatementRecord {
    match outcome {
        ExecOutcome::Rows(out) => StatementRecord {
            index,
            sql: sql.to_string(),
            status: Outcome::Success,
            message: format!("{} rows returned", out.rows.len()),
            columns: Some(out.columns),
            rows: Some(out.rows),
        },
        ExecOutcome::Updated(n) => StatementRecord {
            index,
            sql: sql.to_string(),
            status: Outcome::Success,
            message: format!("{} rows affected", n),
            columns: Some(vec![ColumnMeta::new("updateCount", "NUMBER")]),
            rows: Some(vec![vec![Value::Int(n as i64)]]),
        },
    }
}

impl Worker for SqlWorker {
    fn kind(&self) -> TaskKind {
        TaskKind::Sql
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn transactional(&self) -> bool {
        self.request.transaction
    }

    fn datasource(&self) -> &DataSourceDescriptor {
        &self.request.datasource
    }

    fn run(&mut self, session: &mut dyn DatabaseSession, ctx: &WorkerContext) -> Result<String> {
        let total = self.statements.len();
        let mut failed = 0usize;

        for (index, sql) in self.statements.iter().enumerate() {
            ctx.checkpoint()?;
            ctx.set_message(format!("Execute sql: {}", truncate_label(sql, 60)));
            debug!("Executing statement {}: {}", index, sql);

            match session.execute(sql) {
                Ok(outcome) => ctx.push(ResultRecord::Statement(success_record(index, sql, outcome)))?,
                Err(e) => {
                    warn!("Statement {} failed: {}", index, e);
                    failed += 1;
                    ctx.push(ResultRecord::Statement(StatementRecord {
                        index,
                        sql: sql.clone(),
                        status: Outcome::Fail,
                        message: e.to_string(),
                        columns: None,
                        rows: None,
                    }))?;
                    if self.request.transaction {
                        return Err(TaskError::Execution(format!(
                            "statement {} failed, transaction rolled back: {}",
                            index, e
                        )));
                    }
                }
            }
            ctx.set_progress(((index + 1) as u64 * PROGRESS_MAX as u64 / total as u64) as u32);
        }

        Ok(if failed == 0 {
            format!("Executed {} statements", total)
        } else {
            format!("Executed {} statements, {} failed", total, failed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::result_queue::result_queue;
    use crate::application::task::TaskShared;
    use crate::application::test_support::{descriptor, MockDb};
    use crate::domain::entities::TaskId;
    use std::sync::Arc;

    fn worker(sql: &str, transaction: bool) -> SqlWorker {
        let request = SqlRequest {
            datasource: descriptor(),
            sql: sql.to_string(),
            transaction,
            delimiter: ";".into(),
        };
        SqlWorker::new(request, &EngineConfig::default())
    }

    fn statements_of(records: Vec<ResultRecord>) -> Vec<StatementRecord> {
        records
            .into_iter()
            .map(|r| match r {
                ResultRecord::Statement(s) => s,
                other => panic!("unexpected record {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_label_is_truncated() {
        let w = worker("SELECT a, b, c, d FROM some_really_long_table_name", false);
        assert_eq!(w.label(), "SELECT a, b, c, d FROM some_re...");
        assert_eq!(w.statements().len(), 1);
    }

    #[test]
    fn test_non_transactional_failure_continues() {
        let db = MockDb::new().fail_on("BROKEN");
        let shared = Arc::new(TaskShared::new(TaskId::new(), TaskKind::Sql, "x".into(), false));
        let (tx, rx) = result_queue(16, shared.cancel_flag());
        let ctx = WorkerContext::new(Arc::clone(&shared), tx);

        let mut w = worker("SELECT 1;SELECT BROKEN;UPDATE T SET A=1", false);
        let mut session = db.session();
        let message = w.run(session.as_mut(), &ctx).unwrap();
        assert!(message.contains("1 failed"));

        let records = statements_of(rx.drain());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, Outcome::Success);
        assert_eq!(records[1].status, Outcome::Fail);
        assert_eq!(records[2].columns.as_ref().unwrap()[0].name, "updateCount");
        assert_eq!(shared.snapshot().progress, PROGRESS_MAX);
    }

    #[test]
    fn test_transactional_failure_stops_run() {
        let db = MockDb::new().fail_on("BROKEN");
        let shared = Arc::new(TaskShared::new(TaskId::new(), TaskKind::Sql, "x".into(), true));
        let (tx, rx) = result_queue(16, shared.cancel_flag());
        let ctx = WorkerContext::new(Arc::clone(&shared), tx);

        let mut w = worker("SELECT 1;SELECT BROKEN;SELECT 3", true);
        let mut session = db.session();
        assert!(matches!(
            w.run(session.as_mut(), &ctx),
            Err(TaskError::Execution(_))
        ));

        let records = statements_of(rx.drain());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].status, Outcome::Fail);
        assert!(!db.state().executed.iter().any(|s| s == "SELECT 3"));
    }

    #[test]
    fn test_cancelled_before_first_statement() {
        let db = MockDb::new();
        let shared = Arc::new(TaskShared::new(TaskId::new(), TaskKind::Sql, "x".into(), false));
        let (tx, _rx) = result_queue(16, shared.cancel_flag());
        let ctx = WorkerContext::new(Arc::clone(&shared), tx);
        shared.terminate("stop").unwrap();

        let mut w = worker("SELECT 1", false);
        let mut session = db.session();
        assert!(matches!(w.run(session.as_mut(), &ctx), Err(TaskError::Cancelled)));
        assert!(db.state().executed.is_empty());
    }
}
