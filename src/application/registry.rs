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

//! # Task Registry
//!
//! The registry owns every live task and is the only entry point request
//! handlers use: `submit`, `poll`, `stop`, `commit`, `rollback`, `list`.
//!
//! ## Architecture
//! - **Thread per task**: `submit` starts a named thread running the task's
//!   worker. The number of threads is bounded by the admission limit.
//! - **Shared envelope**: each entry holds an `Arc<TaskShared>` that the
//!   worker updates and handlers read.
//! - **Result queue**: the worker owns the sending half; the entry owns the
//!   receiving half, so removing an entry disconnects a producer that is
//!   still running.
//!
//! Handlers never block on a worker. The task table lock is held only for
//! map operations and queue drains; session I/O for commit/rollback/stop
//! happens after the lock is released.

use crate::application::result_queue::{result_queue, ResultReceiver};
use crate::application::task::TaskShared;
use crate::application::worker::{release_session, run_task, Worker, WorkerContext, WorkerKind};
use crate::config::EngineConfig;
use crate::domain::entities::{
    ControlResponse, PollResponse, SubmitResponse, TaskId, TaskStatus, TaskSummary,
};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::Operation;
use crate::ports::row_sink::SinkFactory;
use crate::ports::row_source::SourceFactory;
use crate::ports::session_port::SessionProvider;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct TaskEntry {
    shared: Arc<TaskShared>,
    results: ResultReceiver,
    handle: Option<JoinHandle<()>>,
}

pub struct TaskRegistry {
    engine: EngineConfig,
    sessions: Arc<dyn SessionProvider>,
    sinks: Arc<dyn SinkFactory>,
    sources: Arc<dyn SourceFactory>,
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new(
        engine: EngineConfig,
        sessions: Arc<dyn SessionProvider>,
        sinks: Arc<dyn SinkFactory>,
        sources: Arc<dyn SourceFactory>,
    ) -> Self {
        Self {
            engine,
            sessions,
            sinks,
            sources,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Parses a `kind`-tagged JSON body and submits it.
    pub fn submit_json(&self, body: &str) -> Result<SubmitResponse> {
        self.submit(Operation::from_json(body)?)
    }

    /// Registers a task for `operation` and starts its worker thread.
    ///
    /// Returns as soon as the thread is started.
    pub fn submit(&self, operation: Operation) -> Result<SubmitResponse> {
        operation.validate()?;
        let worker = WorkerKind::from_operation(operation, &self.engine, &self.sinks, &self.sources)?;
        self.spawn(worker)
    }

    pub(crate) fn spawn<W: Worker + 'static>(&self, worker: W) -> Result<SubmitResponse> {
        let mut tasks = self.tasks.lock();
        if tasks.len() >= self.engine.max_live_tasks {
            warn!(
                "Rejecting {} task: {} tasks already live",
                worker.kind(),
                tasks.len()
            );
            return Err(TaskError::AdmissionRejected {
                limit: self.engine.max_live_tasks,
            });
        }

        let mut id = TaskId::new();
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }

        let shared = Arc::new(TaskShared::new(
            id.clone(),
            worker.kind(),
            worker.label(),
            worker.transactional(),
        ));
        let (tx, rx) = result_queue(self.engine.result_queue_capacity, shared.cancel_flag());
        let ctx = WorkerContext::new(Arc::clone(&shared), tx);
        let sessions = Arc::clone(&self.sessions);

        let handle = thread::Builder::new()
            .name(format!("task-{}", id))
            .spawn(move || run_task(worker, ctx, sessions))
            .map_err(|e| TaskError::Fatal(format!("cannot start worker thread: {}", e)))?;

        info!("Submitted {} task {}: {}", shared.kind(), id, shared.label());
        tasks.insert(
            id.clone(),
            TaskEntry {
                shared,
                results: rx,
                handle: Some(handle),
            },
        );

        Ok(SubmitResponse {
            id,
            status: TaskStatus::Running,
            code: TaskStatus::Running.code(),
        })
    }

    /// Reports the task's state along with every record buffered since the
    /// previous poll.
    ///
    /// A finished task is removed unless it still holds an unresolved
    /// transaction.
    pub fn poll(&self, id: &TaskId) -> Result<PollResponse> {
        let mut tasks = self.tasks.lock();
        let entry = tasks.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))?;

        // Sampled before draining: once finished, the worker has pushed everything.
        let snap = entry.shared.snapshot();
        let data = entry.results.drain();

        if snap.is_finished() && !snap.unresolved_transaction {
            tasks.remove(id);
            debug!("Task {} removed after final poll", id);
        }

        Ok(PollResponse {
            id: id.clone(),
            status: snap.status,
            code: snap.status.code(),
            start_time: snap.start_time,
            end_time: snap.end_time,
            progress: snap.progress,
            message: snap.message,
            data,
        })
    }

    /// Terminates and removes a task.
    ///
    /// Refused with `TransactionPending` for an unresolved transaction. A
    /// running worker is signalled and releases its own session when it
    /// next checks for cancellation.
    pub fn stop(&self, id: &TaskId) -> Result<ControlResponse> {
        let (was_running, parked) = {
            let mut tasks = self.tasks.lock();
            let entry = tasks.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))?;
            let was_running = entry.shared.snapshot().status.is_running();
            let parked = entry.shared.terminate("Task has been terminated")?;
            tasks.remove(id);
            (was_running, parked)
        };

        let mut message = if was_running {
            "Task has been terminated".to_string()
        } else {
            "Task has been removed".to_string()
        };
        if let Some(session) = parked {
            let notes = release_session(session, true);
            if !notes.is_empty() {
                message = format!("{} ({})", message, notes.join("; "));
            }
        }
        info!("Stopped task {}: {}", id, message);
        Ok(ControlResponse::success(id.clone(), message))
    }

    pub fn commit(&self, id: &TaskId) -> Result<ControlResponse> {
        self.resolve(id, true)
    }

    pub fn rollback(&self, id: &TaskId) -> Result<ControlResponse> {
        self.resolve(id, false)
    }

    /// Ends the parked transaction of a finished task.
    ///
    /// Success or failure, the session is closed and the task removed.
    fn resolve(&self, id: &TaskId, commit: bool) -> Result<ControlResponse> {
        let shared = {
            let tasks = self.tasks.lock();
            let entry = tasks.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))?;
            Arc::clone(&entry.shared)
        };
        let mut session = shared.take_parked_session()?;

        let (verb, done) = if commit {
            ("Commit", "Transaction committed")
        } else {
            ("Rollback", "Transaction rolled back")
        };
        let outcome = if commit {
            session.commit()
        } else {
            session.rollback()
        };
        let closed = session.close();

        let message = match (&outcome, &closed) {
            (Ok(()), Ok(())) => done.to_string(),
            (Ok(()), Err(e)) => format!("{} (close failed: {})", done, e),
            (Err(e), _) => format!("{} failed: {}", verb, e),
        };
        shared.mark_resolved(message.clone());
        self.tasks.lock().remove(id);

        match outcome {
            Ok(()) => {
                info!("Task {}: {}", id, message);
                Ok(ControlResponse::success(id.clone(), message))
            }
            Err(e) => {
                error!("Task {}: {}; session closed and task removed", id, message);
                Err(TaskError::Execution(format!("{} failed: {}", verb.to_lowercase(), e)))
            }
        }
    }

    /// Snapshot of all live tasks, oldest first.
    pub fn list(&self) -> Vec<TaskSummary> {
        let tasks = self.tasks.lock();
        let mut out: Vec<TaskSummary> = tasks.values().map(|e| e.shared.summary()).collect();
        out.sort_by_key(|s| s.start_time);
        out
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Cancels every live task, rolls back parked transactions and waits for
    /// the worker threads to exit.
    pub fn shutdown(&self) {
        let entries: Vec<(TaskId, TaskEntry)> = self.tasks.lock().drain().collect();
        if !entries.is_empty() {
            info!("Shutting down {} live tasks", entries.len());
        }
        for (id, entry) in entries {
            let TaskEntry {
                shared,
                results,
                handle,
            } = entry;
            if let Some(session) = shared.take_any_parked() {
                let notes = release_session(session, true);
                if !notes.is_empty() {
                    warn!("Task {} cleanup on shutdown: {}", id, notes.join("; "));
                }
            }
            drop(results);
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!("Worker thread of task {} panicked", id);
                }
            }
        }
    }
}
