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

//! # Task Envelope
//!
//! `TaskShared` is the state a worker thread and the request handlers both
//! see: status, progress, message, timestamps, the transaction flags and,
//! once the worker is done with it, the parked database session.
//!
//! All mutable fields sit behind one `parking_lot::Mutex` so that status,
//! `end_time` and the session slot always change together. The worker never
//! holds this lock across database or queue I/O.

use crate::domain::entities::{TaskId, TaskKind, TaskStatus, TaskSummary, PROGRESS_MAX};
use crate::domain::errors::{Result, TaskError};
use crate::ports::session_port::DatabaseSession;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where a task's session currently lives.
enum SessionSlot {
    /// The worker has not opened one yet.
    Unopened,
    /// The worker thread owns it.
    InWorker,
    /// Left open after a successful transactional run, awaiting commit/rollback.
    Parked(Box<dyn DatabaseSession>),
    Closed,
}

struct TaskState {
    status: TaskStatus,
    progress: u32,
    message: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    commit_or_rollback_done: bool,
    session: SessionSlot,
}

/// Point-in-time copy of the mutable fields.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub progress: u32,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub commit_or_rollback_done: bool,
    /// Transactional, finished, and neither committed nor rolled back.
    pub unresolved_transaction: bool,
}

impl TaskSnapshot {
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

pub struct TaskShared {
    id: TaskId,
    kind: TaskKind,
    label: String,
    transactional: bool,
    cancel: Arc<AtomicBool>,
    state: Mutex<TaskState>,
}

impl TaskShared {
    pub fn new(id: TaskId, kind: TaskKind, label: String, transactional: bool) -> Self {
        Self {
            id,
            kind,
            label,
            transactional,
            cancel: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(TaskState {
                status: TaskStatus::Running,
                progress: 0,
                message: "Task submitted".to_string(),
                start_time: Utc::now(),
                end_time: None,
                commit_or_rollback_done: false,
                session: SessionSlot::Unopened,
            }),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transactional(&self) -> bool {
        self.transactional
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn unresolved(&self, s: &TaskState) -> bool {
        self.transactional && s.end_time.is_some() && !s.commit_or_rollback_done
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let s = self.state.lock();
        TaskSnapshot {
            status: s.status,
            progress: s.progress,
            message: s.message.clone(),
            start_time: s.start_time,
            end_time: s.end_time,
            commit_or_rollback_done: s.commit_or_rollback_done,
            unresolved_transaction: self.unresolved(&s),
        }
    }

    pub fn summary(&self) -> TaskSummary {
        let snap = self.snapshot();
        TaskSummary {
            id: self.id.clone(),
            kind: self.kind,
            start_time: snap.start_time,
            end_time: snap.end_time,
            status: snap.status,
            code: snap.status.code(),
            message: snap.message,
            label: self.label.clone(),
            progress: snap.progress,
            transactional: self.transactional,
        }
    }

    /// Raises progress; lower values are ignored so progress never decreases.
    pub fn set_progress(&self, progress: u32) {
        let mut s = self.state.lock();
        if s.status.is_running() {
            s.progress = s.progress.max(progress.min(PROGRESS_MAX));
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let mut s = self.state.lock();
        if s.status.is_running() {
            s.message = message.into();
        }
    }

    pub(crate) fn session_taken_by_worker(&self) {
        self.state.lock().session = SessionSlot::InWorker;
    }

    /// Records the worker's terminal state.
    ///
    /// `parked` is kept open for a later commit/rollback. If the task was
    /// already terminated by `stop`, nothing changes and `parked` is handed
    /// back so the caller can release it.
    pub(crate) fn finish(
        &self,
        status: TaskStatus,
        message: String,
        parked: Option<Box<dyn DatabaseSession>>,
        resolved: bool,
    ) -> Option<Box<dyn DatabaseSession>> {
        let mut s = self.state.lock();
        if !s.status.is_running() {
            return parked;
        }
        s.status = status;
        s.message = message;
        s.end_time = Some(Utc::now());
        if status == TaskStatus::Success {
            s.progress = PROGRESS_MAX;
        }
        s.commit_or_rollback_done = s.commit_or_rollback_done || resolved;
        s.session = match parked {
            Some(session) => SessionSlot::Parked(session),
            None => SessionSlot::Closed,
        };
        None
    }

    /// Marks the task terminated and signals the worker to stop.
    ///
    /// Refuses with `TransactionPending`, changing nothing, when the task
    /// holds an unresolved transaction. Returns any parked session for the
    /// caller to close.
    pub(crate) fn terminate(&self, message: &str) -> Result<Option<Box<dyn DatabaseSession>>> {
        let mut s = self.state.lock();
        if self.unresolved(&s) {
            return Err(TaskError::TransactionPending(self.id.clone()));
        }
        self.cancel.store(true, Ordering::SeqCst);
        if s.status.is_running() {
            s.status = TaskStatus::Terminated;
            s.message = message.to_string();
            s.end_time = Some(Utc::now());
        }
        let parked = match std::mem::replace(&mut s.session, SessionSlot::Closed) {
            SessionSlot::Parked(session) => Some(session),
            other => {
                s.session = other;
                None
            }
        };
        Ok(parked)
    }

    /// Takes the parked session for a commit or rollback.
    ///
    /// Fails with `TaskRunning` while the worker still owns the session or
    /// when no session was left open.
    pub(crate) fn take_parked_session(&self) -> Result<Box<dyn DatabaseSession>> {
        let mut s = self.state.lock();
        match std::mem::replace(&mut s.session, SessionSlot::Closed) {
            SessionSlot::Parked(session) => Ok(session),
            other => {
                s.session = other;
                Err(TaskError::TaskRunning(self.id.clone()))
            }
        }
    }

    /// Records that the transaction was committed or rolled back.
    pub(crate) fn mark_resolved(&self, message: String) {
        let mut s = self.state.lock();
        s.commit_or_rollback_done = true;
        s.message = message;
    }

    /// Takes the parked session unconditionally, for shutdown.
    pub(crate) fn take_any_parked(&self) -> Option<Box<dyn DatabaseSession>> {
        self.cancel.store(true, Ordering::SeqCst);
        let mut s = self.state.lock();
        match std::mem::replace(&mut s.session, SessionSlot::Closed) {
            SessionSlot::Parked(session) => Some(session),
            other => {
                s.session = other;
                None
            }
        }
    }
}
