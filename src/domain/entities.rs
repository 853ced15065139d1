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

//! # Domain Entities
//!
//! Entities are the "Nouns" of the engine: task ids, statuses, cell values,
//! column descriptions, result records and the response bodies handed back
//! to a polling client.
//!
//! Everything here derives `serde` so request handlers can turn it into JSON
//! without a separate transport model.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Upper bound of the fixed-point progress scale (`10000` = 100.00%).
pub const PROGRESS_MAX: u32 = 10_000;

/// Opaque identifier of a registered task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocates a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which worker executes a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Sql,
    Dump,
    Import,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Sql => write!(f, "sql"),
            TaskKind::Dump => write!(f, "dump"),
            TaskKind::Import => write!(f, "import"),
        }
    }
}

/// Domain-level status of a task or of a control request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Success,
    /// Stopped on request before it finished on its own.
    Terminated,
    Fatal,
    NotFound,
    DatasourceMissing,
    TaskRunning,
    TransactionPending,
    CapacityExceeded,
    InvalidRequest,
}

impl TaskStatus {
    /// Numeric code carried next to the status on the wire.
    pub fn code(&self) -> u16 {
        match self {
            TaskStatus::CapacityExceeded => 100,
            TaskStatus::Running => 102,
            TaskStatus::Success => 200,
            TaskStatus::Terminated => 210,
            TaskStatus::InvalidRequest => 400,
            TaskStatus::Fatal => 500,
            TaskStatus::NotFound => 820,
            TaskStatus::DatasourceMissing => 830,
            TaskStatus::TaskRunning => 840,
            TaskStatus::TransactionPending => 850,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TaskStatus::Running)
    }
}

/// A single cell value moving between a session, a sink and a result record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Plain text rendering used by delimited outputs. Bytes become base64.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Bytes(b) => Some(general_purpose::STANDARD.encode(b)),
        }
    }

    /// Interprets the value as a row count (e.g. the result of `COUNT(*)`).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::Float(f) if *f >= 0.0 => Some(*f as u64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&general_purpose::STANDARD.encode(b)),
        }
    }
}

/// Description of one result column.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub name: String,
    pub label: String,
    /// Database type name as reported by the driver (e.g. `NUMBER`, `VARCHAR2`).
    pub type_name: String,
    pub display_size: u32,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            type_name: type_name.into(),
            display_size: 0,
        }
    }
}

/// Outcome of one statement or table.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

/// Result of one statement within an SQL task.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatementRecord {
    pub index: usize,
    pub sql: String,
    pub status: Outcome,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnMeta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<Value>>>,
}

/// Result of exporting one table within a dump task.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub table: String,
    pub status: Outcome,
    pub rows: u64,
    pub message: String,
}

/// Totals of a finished import task.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub table: String,
    pub rows: u64,
    pub batches: u64,
}

/// An opaque entry on a task's result queue.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultRecord {
    Statement(StatementRecord),
    Table(TableRecord),
    Import(ImportRecord),
}

/// Read-only snapshot of a live task as returned by `list()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: TaskId,
    pub kind: TaskKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub code: u16,
    pub message: String,
    pub label: String,
    pub progress: u32,
    pub transactional: bool,
}

/// Body returned by a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: TaskId,
    pub status: TaskStatus,
    pub code: u16,
}

/// Body returned by a poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: TaskId,
    pub status: TaskStatus,
    pub code: u16,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: u32,
    pub message: String,
    pub data: Vec<ResultRecord>,
}

/// Body returned by stop, commit and rollback, and by any failed request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub status: TaskStatus,
    pub code: u16,
    pub message: String,
}

impl ControlResponse {
    pub fn success(id: TaskId, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            status: TaskStatus::Success,
            code: TaskStatus::Success.code(),
            message: message.into(),
        }
    }

    /// Maps a request error onto its wire body.
    pub fn from_error(id: Option<TaskId>, err: &crate::domain::errors::TaskError) -> Self {
        let status = err.status();
        Self {
            id,
            status,
            code: status.code(),
            message: err.to_string(),
        }
    }
}
