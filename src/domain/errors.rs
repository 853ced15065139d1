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

//! Core error definitions for the task engine.
//!
//! This module provides a centralized `TaskError` enum and a `Result` type
//! used throughout the crate to handle admission, lookup, database, file and
//! worker failures.

use crate::domain::entities::{TaskId, TaskStatus};
use thiserror::Error;

/// Error types encountered while submitting, running or controlling a task.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Too many tasks: at most {limit} may be live at once")]
    AdmissionRejected { limit: usize },

    #[error("Task does not exist: {0}")]
    NotFound(TaskId),

    #[error("Datasource unavailable: {0}")]
    DatasourceUnavailable(String),

    #[error("Task {0} holds an open transaction; commit or rollback first")]
    TransactionPending(TaskId),

    #[error("Task {0} has no parked session to act on")]
    TaskRunning(TaskId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Worker failed: {0}")]
    Fatal(String),

    #[error("Row sink error: {0}")]
    Sink(String),

    #[error("Row source error: {0}")]
    Source(String),

    #[error("Task was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<oracle::Error> for TaskError {
    fn from(e: oracle::Error) -> Self {
        TaskError::Oracle(e.to_string())
    }
}

impl From<csv::Error> for TaskError {
    fn from(e: csv::Error) -> Self {
        TaskError::Csv(e.to_string())
    }
}

impl TaskError {
    /// The domain status a caller sees when a request fails with this error.
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskError::AdmissionRejected { .. } => TaskStatus::CapacityExceeded,
            TaskError::NotFound(_) => TaskStatus::NotFound,
            TaskError::DatasourceUnavailable(_) => TaskStatus::DatasourceMissing,
            TaskError::TransactionPending(_) => TaskStatus::TransactionPending,
            TaskError::TaskRunning(_) => TaskStatus::TaskRunning,
            TaskError::InvalidRequest(_) | TaskError::Config(_) => TaskStatus::InvalidRequest,
            TaskError::Cancelled => TaskStatus::Terminated,
            _ => TaskStatus::Fatal,
        }
    }
}

/// A specialized Result type for the task engine.
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let id = TaskId::new();
        assert_eq!(
            TaskError::AdmissionRejected { limit: 10 }.status(),
            TaskStatus::CapacityExceeded
        );
        assert_eq!(TaskError::NotFound(id.clone()).status(), TaskStatus::NotFound);
        assert_eq!(
            TaskError::TransactionPending(id).status(),
            TaskStatus::TransactionPending
        );
        assert_eq!(
            TaskError::DatasourceUnavailable("x".into()).status(),
            TaskStatus::DatasourceMissing
        );
        assert_eq!(TaskError::Sink("disk full".into()).status(), TaskStatus::Fatal);
    }
}
