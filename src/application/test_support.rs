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

//! In-memory port implementations shared by the unit tests.

use crate::application::registry::TaskRegistry;
use crate::application::task::TaskShared;
use crate::domain::entities::{ColumnMeta, PollResponse, ResultRecord, TaskId, Value};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::{DataSourceDescriptor, SourceFormat};
use crate::ports::row_sink::{RowSink, SinkFactory, SinkSpec};
use crate::ports::row_source::{RowSource, SourceFactory, SourceRow};
use crate::ports::session_port::{DatabaseSession, ExecOutcome, QueryOutput, SessionProvider};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn descriptor() -> DataSourceDescriptor {
    DataSourceDescriptor {
        name: "local".into(),
        kind: "oracle".into(),
        host: "localhost".into(),
        port: 1521,
        username: "scott".into(),
        password: Some("tiger".into()),
        database: "XE".into(),
        driver: None,
        params: HashMap::new(),
    }
}

/// Spins until `cond` holds, failing the test after ten seconds.
pub fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Polls until the task reports an end time, collecting every drained record.
pub fn poll_until_finished(registry: &TaskRegistry, id: &TaskId) -> (PollResponse, Vec<ResultRecord>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut data = Vec::new();
    loop {
        let mut resp = registry.poll(id).expect("poll failed");
        data.append(&mut resp.data);
        if resp.end_time.is_some() {
            return (resp, data);
        }
        assert!(Instant::now() < deadline, "task {} did not finish", id);
        thread::sleep(Duration::from_millis(2));
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub executed: Vec<String>,
    pub batches: usize,
    pub pending_inserts: usize,
    pub committed_inserts: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub sessions_opened: usize,
    pub open_sessions: usize,
    pub closed: bool,
    pub tables: HashMap<String, u64>,
    pub fail_on: Vec<String>,
    pub fail_commit: bool,
    pub fail_close: bool,
    pub unavailable: bool,
    /// While set, `execute` blocks.
    pub held: bool,
}

/// A fake database shared by every session it hands out.
#[derive(Clone, Default)]
pub struct MockDb {
    inner: Arc<(Mutex<MockState>, Condvar)>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, rows: u64) -> Self {
        self.state().tables.insert(name.to_string(), rows);
        self
    }

    /// Statements containing `fragment` fail.
    pub fn fail_on(self, fragment: &str) -> Self {
        self.state().fail_on.push(fragment.to_string());
        self
    }

    pub fn fail_commit(self) -> Self {
        self.state().fail_commit = true;
        self
    }

    pub fn with_close_failure(self) -> Self {
        self.state().fail_close = true;
        self
    }

    pub fn unavailable(self) -> Self {
        self.state().unavailable = true;
        self
    }

    pub fn hold(&self) {
        self.state().held = true;
    }

    pub fn release(&self) {
        self.state().held = false;
        self.inner.1.notify_all();
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.0.lock()
    }

    pub fn session(&self) -> Box<dyn DatabaseSession> {
        let mut st = self.state();
        st.sessions_opened += 1;
        st.open_sessions += 1;
        Box::new(MockSession {
            db: self.clone(),
            autocommit: true,
            closed: false,
        })
    }

    pub fn provider(&self) -> Arc<dyn SessionProvider> {
        Arc::new(MockProvider { db: self.clone() })
    }
}

pub struct MockSession {
    db: MockDb,
    autocommit: bool,
    closed: bool,
}

fn keyword_arg(tokens: &[&str], keyword: &str) -> Option<u64> {
    let pos = tokens.iter().position(|t| t.eq_ignore_ascii_case(keyword))?;
    tokens.get(pos + 1)?.parse().ok()
}

impl MockSession {
    fn respond(&self, st: &mut MockState, sql: &str) -> ExecOutcome {
        let upper = sql.trim().to_ascii_uppercase();
        let tokens: Vec<&str> = sql.split_whitespace().collect();

        if upper.starts_with("SELECT COUNT(*) FROM ") {
            let count = tokens.get(3).and_then(|t| st.tables.get(*t)).copied().unwrap_or(0);
            ExecOutcome::Rows(QueryOutput {
                columns: vec![ColumnMeta::new("COUNT(*)", "NUMBER")],
                rows: vec![vec![Value::Int(count as i64)]],
            })
        } else if upper.starts_with("SELECT * FROM ") {
            let count = tokens.get(3).and_then(|t| st.tables.get(*t)).copied().unwrap_or(0);
            let offset = keyword_arg(&tokens, "OFFSET").unwrap_or(0);
            let limit = keyword_arg(&tokens, "LIMIT")
                .or_else(|| keyword_arg(&tokens, "NEXT"))
                .unwrap_or(count);
            let end = count.min(offset.saturating_add(limit));
            ExecOutcome::Rows(QueryOutput {
                columns: vec![
                    ColumnMeta::new("ID", "NUMBER"),
                    ColumnMeta::new("NAME", "VARCHAR2"),
                ],
                rows: (offset..end)
                    .map(|i| vec![Value::Int(i as i64), Value::Text(format!("row{}", i))])
                    .collect(),
            })
        } else if upper.starts_with("SHOW CREATE TABLE ") {
            let table = tokens.get(3).copied().unwrap_or_default();
            ExecOutcome::Rows(QueryOutput {
                columns: vec![ColumnMeta::new("TABLE", "TEXT"), ColumnMeta::new("DDL", "TEXT")],
                rows: vec![vec![
                    Value::Text(table.to_string()),
                    Value::Text(format!("CREATE TABLE {} (ID NUMBER, NAME VARCHAR2(20))", table)),
                ]],
            })
        } else if upper.starts_with("SELECT ") {
            let expr = sql.trim()[7..].trim();
            let value = expr
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(expr.to_string()));
            ExecOutcome::Rows(QueryOutput {
                columns: vec![ColumnMeta::new("VALUE", "NUMBER")],
                rows: vec![vec![value]],
            })
        } else if upper.starts_with("INSERT") {
            if self.autocommit {
                st.committed_inserts += 1;
            } else {
                st.pending_inserts += 1;
            }
            ExecOutcome::Updated(1)
        } else {
            ExecOutcome::Updated(0)
        }
    }
}

impl DatabaseSession for MockSession {
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        if self.closed {
            return Err(TaskError::Execution("session is closed".into()));
        }
        let (lock, gate) = &*self.db.inner;
        let mut st = lock.lock();
        while st.held {
            gate.wait(&mut st);
        }
        st.executed.push(sql.to_string());
        if st.fail_on.iter().any(|f| sql.contains(f.as_str())) {
            return Err(TaskError::Execution(format!("mock failure on: {}", sql)));
        }
        Ok(self.respond(&mut st, sql))
    }

    fn execute_batch(&mut self, statements: &[String]) -> Result<Vec<u64>> {
        self.db.state().batches += 1;
        let mut counts = Vec::with_capacity(statements.len());
        for sql in statements {
            match self.execute(sql)? {
                ExecOutcome::Updated(n) => counts.push(n),
                ExecOutcome::Rows(_) => counts.push(0),
            }
        }
        Ok(counts)
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        self.autocommit = enabled;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn commit(&mut self) -> Result<()> {
        let mut st = self.db.state();
        st.commits += 1;
        if st.fail_commit {
            return Err(TaskError::Execution("mock commit failure".into()));
        }
        st.committed_inserts += st.pending_inserts;
        st.pending_inserts = 0;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let mut st = self.db.state();
        st.rollbacks += 1;
        st.pending_inserts = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(TaskError::Execution("session already closed".into()));
        }
        self.closed = true;
        let mut st = self.db.state();
        st.closed = true;
        st.open_sessions = st.open_sessions.saturating_sub(1);
        if st.fail_close {
            return Err(TaskError::Execution("mock close failure".into()));
        }
        Ok(())
    }
}

pub struct MockProvider {
    db: MockDb,
}

impl SessionProvider for MockProvider {
    fn open_session(&self, descriptor: &DataSourceDescriptor) -> Result<Box<dyn DatabaseSession>> {
        if self.db.state().unavailable {
            return Err(TaskError::DatasourceUnavailable(descriptor.name.clone()));
        }
        Ok(self.db.session())
    }
}

/// Sink that records every call as a short event string.
#[derive(Default)]
pub struct RecordingSinkFactory {
    events: Arc<Mutex<Vec<String>>>,
    progress: Arc<Mutex<Vec<u32>>>,
    probe: Option<Arc<TaskShared>>,
    fail_open: bool,
}

impl RecordingSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the task's progress at the start of every page.
    pub fn with_probe(mut self, shared: Arc<TaskShared>) -> Self {
        self.probe = Some(shared);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn progress_seen(&self) -> Vec<u32> {
        self.progress.lock().clone()
    }
}

impl SinkFactory for RecordingSinkFactory {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn RowSink>> {
        if self.fail_open {
            return Err(TaskError::Sink(format!("cannot create {}", spec.file_name)));
        }
        self.events.lock().push(format!("open:{}", spec.file_name));
        Ok(Box::new(RecordingSink {
            events: Arc::clone(&self.events),
            progress: Arc::clone(&self.progress),
            probe: self.probe.clone(),
        }))
    }
}

struct RecordingSink {
    events: Arc<Mutex<Vec<String>>>,
    progress: Arc<Mutex<Vec<u32>>>,
    probe: Option<Arc<TaskShared>>,
}

impl RecordingSink {
    fn log(&self, event: String) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl RowSink for RecordingSink {
    fn begin_table(&mut self, table: &str) -> Result<()> {
        self.log(format!("begin:{}", table))
    }

    fn write_structure(&mut self, table: &str, drop_sql: Option<&str>, ddl: Option<&str>) -> Result<()> {
        self.log(format!(
            "structure:{}:{}:{}",
            table,
            if drop_sql.is_some() { "drop" } else { "-" },
            if ddl.is_some() { "ddl" } else { "-" }
        ))
    }

    fn note_total(&mut self, table: &str, total: u64) -> Result<()> {
        self.log(format!("total:{}:{}", table, total))
    }

    fn begin_page(&mut self, table: &str, offset: u64, len: u64) -> Result<()> {
        if let Some(shared) = &self.probe {
            self.progress.lock().push(shared.snapshot().progress);
        }
        self.log(format!("page:{}:{}:{}", table, offset, len))
    }

    fn write_rows(&mut self, table: &str, _columns: &[ColumnMeta], rows: &[Vec<Value>]) -> Result<()> {
        self.log(format!("rows:{}:{}", table, rows.len()))
    }

    fn write_error(&mut self, table: &str, message: &str) -> Result<()> {
        self.log(format!("error:{}:{}", table, message))
    }

    fn end_table(&mut self, table: &str) -> Result<()> {
        self.log(format!("end:{}", table))
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.log("finish".to_string())
    }
}

/// Source serving a fixed list of rows.
pub struct VecSourceFactory {
    rows: Vec<SourceRow>,
}

impl VecSourceFactory {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }
}

impl SourceFactory for VecSourceFactory {
    fn open(&self, _path: &Path, _format: SourceFormat, _delimiter: Option<char>) -> Result<Box<dyn RowSource>> {
        Ok(Box::new(VecSource {
            total: self.rows.len() as u64,
            rows: self.rows.clone().into_iter(),
        }))
    }
}

struct VecSource {
    total: u64,
    rows: std::vec::IntoIter<SourceRow>,
}

impl Iterator for VecSource {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}

impl RowSource for VecSource {
    fn total_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
