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

//! # Worker Driver
//!
//! A `Worker` is the body of one task. `run_task` is the thread entry point
//! that wraps every worker kind with the same lifecycle:
//!
//! 1. Open a session for the task's datasource.
//! 2. Disable autocommit for transactional work.
//! 3. Run the body, catching panics.
//! 4. Park the session (successful transactional run) or roll back and close.
//! 5. Publish the terminal status; cleanup failures are appended to its message.

use crate::application::dump_worker::DumpWorker;
use crate::application::import_worker::ImportWorker;
use crate::application::result_queue::ResultSender;
use crate::application::sql_worker::SqlWorker;
use crate::application::task::TaskShared;
use crate::config::EngineConfig;
use crate::domain::entities::{ResultRecord, TaskKind, TaskStatus};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::{DataSourceDescriptor, Operation};
use crate::ports::row_sink::SinkFactory;
use crate::ports::row_source::SourceFactory;
use crate::ports::session_port::{DatabaseSession, SessionProvider};
use log::{error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What a running worker can see of its own task.
pub struct WorkerContext {
    shared: Arc<TaskShared>,
    results: ResultSender,
}

impl WorkerContext {
    pub fn new(shared: Arc<TaskShared>, results: ResultSender) -> Self {
        Self { shared, results }
    }

    pub fn shared(&self) -> &TaskShared {
        &self.shared
    }

    /// Fails with `Cancelled` once the task has been stopped.
    pub fn checkpoint(&self) -> Result<()> {
        if self.shared.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn set_progress(&self, progress: u32) {
        self.shared.set_progress(progress);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.shared.set_message(message);
    }

    /// Enqueues a result record, blocking while the queue is full.
    pub fn push(&self, record: ResultRecord) -> Result<()> {
        self.results.push(record)
    }
}

/// The executable body of one task.
pub trait Worker: Send {
    fn kind(&self) -> TaskKind;

    /// Short human description shown by `list()`.
    fn label(&self) -> String;

    fn transactional(&self) -> bool;

    fn datasource(&self) -> &DataSourceDescriptor;

    /// Does the work against an already opened session and returns the
    /// terminal success message.
    fn run(&mut self, session: &mut dyn DatabaseSession, ctx: &WorkerContext) -> Result<String>;
}

/// One variant per operation kind.
pub enum WorkerKind {
    Sql(SqlWorker),
    Dump(DumpWorker),
    Import(ImportWorker),
}

impl WorkerKind {
    pub fn from_operation(
        operation: Operation,
        engine: &EngineConfig,
        sinks: &Arc<dyn SinkFactory>,
        sources: &Arc<dyn SourceFactory>,
    ) -> Result<Self> {
        Ok(match operation {
            Operation::Sql(r) => WorkerKind::Sql(SqlWorker::new(r, engine)),
            Operation::Dump(r) => WorkerKind::Dump(DumpWorker::new(r, engine, Arc::clone(sinks))),
            Operation::Import(r) => {
                WorkerKind::Import(ImportWorker::new(r, engine, Arc::clone(sources))?)
            }
        })
    }

    fn inner(&self) -> &dyn Worker {
        match self {
            WorkerKind::Sql(w) => w,
            WorkerKind::Dump(w) => w,
            WorkerKind::Import(w) => w,
        }
    }
}

impl Worker for WorkerKind {
    fn kind(&self) -> TaskKind {
        self.inner().kind()
    }

    fn label(&self) -> String {
        self.inner().label()
    }

    fn transactional(&self) -> bool {
        self.inner().transactional()
    }

    fn datasource(&self) -> &DataSourceDescriptor {
        self.inner().datasource()
    }

    fn run(&mut self, session: &mut dyn DatabaseSession, ctx: &WorkerContext) -> Result<String> {
        match self {
            WorkerKind::Sql(w) => w.run(session, ctx),
            WorkerKind::Dump(w) => w.run(session, ctx),
            WorkerKind::Import(w) => w.run(session, ctx),
        }
    }
}

/// Terminal state produced by one run.
struct Completion {
    status: TaskStatus,
    message: String,
    parked: Option<Box<dyn DatabaseSession>>,
    resolved: bool,
}

impl Completion {
    fn ended(status: TaskStatus, message: String) -> Self {
        Self {
            status,
            message,
            parked: None,
            resolved: true,
        }
    }
}

/// Rolls back (when asked and the session is not autocommitting) and closes.
///
/// Returns a note for every step that failed.
pub(crate) fn release_session(mut session: Box<dyn DatabaseSession>, rollback: bool) -> Vec<String> {
    let mut notes = Vec::new();
    if rollback && !session.autocommit() {
        if let Err(e) = session.rollback() {
            warn!("Rollback during cleanup failed: {}", e);
            notes.push(format!("rollback failed: {}", e));
        }
    }
    if let Err(e) = session.close() {
        warn!("Closing session failed: {}", e);
        notes.push(format!("close failed: {}", e));
    }
    notes
}

fn with_notes(message: String, notes: &[String]) -> String {
    if notes.is_empty() {
        message
    } else {
        format!("{} ({})", message, notes.join("; "))
    }
}

fn drive<W: Worker>(
    worker: &mut W,
    ctx: &WorkerContext,
    sessions: &dyn SessionProvider,
) -> Completion {
    let transactional = worker.transactional();

    let mut session = match sessions.open_session(worker.datasource()) {
        Ok(s) => s,
        Err(e) => {
            let status = match e {
                TaskError::DatasourceUnavailable(_) => TaskStatus::DatasourceMissing,
                _ => TaskStatus::Fatal,
            };
            return Completion::ended(status, format!("Cannot open session: {}", e));
        }
    };
    ctx.shared().session_taken_by_worker();

    if transactional {
        if let Err(e) = session.set_autocommit(false) {
            let notes = release_session(session, false);
            return Completion::ended(
                TaskStatus::Fatal,
                with_notes(format!("Cannot start transaction: {}", e), &notes),
            );
        }
    }

    match worker.run(session.as_mut(), ctx) {
        Ok(message) if transactional => Completion {
            status: TaskStatus::Success,
            message,
            parked: Some(session),
            resolved: false,
        },
        Ok(message) => {
            let notes = release_session(session, false);
            Completion::ended(TaskStatus::Success, with_notes(message, &notes))
        }
        Err(TaskError::Cancelled) => {
            let notes = release_session(session, transactional);
            Completion::ended(
                TaskStatus::Terminated,
                with_notes("Task has been terminated".to_string(), &notes),
            )
        }
        Err(e) => {
            let notes = release_session(session, transactional);
            Completion::ended(TaskStatus::Fatal, with_notes(e.to_string(), &notes))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Thread entry point of a task. Never panics.
pub(crate) fn run_task<W: Worker>(mut worker: W, ctx: WorkerContext, sessions: Arc<dyn SessionProvider>) {
    let id = ctx.shared().id().clone();
    info!("Task {} ({}) started: {}", id, worker.kind(), worker.label());

    let completion = match panic::catch_unwind(AssertUnwindSafe(|| {
        drive(&mut worker, &ctx, sessions.as_ref())
    })) {
        Ok(c) => c,
        Err(payload) => {
            Completion::ended(TaskStatus::Fatal, format!("Worker panicked: {}", panic_message(payload.as_ref())))
        }
    };

    match completion.status {
        TaskStatus::Success => info!("Task {} finished: {}", id, completion.message),
        TaskStatus::Terminated => info!("Task {} terminated: {}", id, completion.message),
        _ => error!("Task {} failed: {}", id, completion.message),
    }

    let leftover = ctx.shared().finish(
        completion.status,
        completion.message,
        completion.parked,
        completion.resolved,
    );
    // Stopped while finishing: nobody will commit this session.
    if let Some(session) = leftover {
        let notes = release_session(session, true);
        if !notes.is_empty() {
            warn!("Task {} cleanup after stop: {}", id, notes.join("; "));
        }
    }
}
