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

//! # Session Port
//!
//! This Port defines what a worker needs from a database connection. It does
//! not care whether the session is a pooled Oracle connection or an in-memory
//! mock: anything that implements `DatabaseSession` can be handed to a worker.

use crate::domain::entities::{ColumnMeta, Value};
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::DataSourceDescriptor;

/// Column metadata plus the materialized rows of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    /// First cell of the first row, if any.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }
}

/// What executing an arbitrary statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Rows(QueryOutput),
    Updated(u64),
}

/// A connection/transaction handle owned by exactly one task at a time.
///
/// `Send` is required because a session is opened on the worker thread and
/// may later be committed from a request-handling thread.
pub trait DatabaseSession: Send {
    /// Runs any statement.
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome>;

    /// Runs a statement that must return rows.
    fn query(&mut self, sql: &str) -> Result<QueryOutput> {
        match self.execute(sql)? {
            ExecOutcome::Rows(out) => Ok(out),
            ExecOutcome::Updated(_) => Err(TaskError::Execution(format!(
                "statement returned no rows: {}",
                sql
            ))),
        }
    }

    /// Runs a group of non-query statements, returning each update count.
    fn execute_batch(&mut self, statements: &[String]) -> Result<Vec<u64>> {
        let mut counts = Vec::with_capacity(statements.len());
        for sql in statements {
            match self.execute(sql)? {
                ExecOutcome::Updated(n) => counts.push(n),
                ExecOutcome::Rows(out) => counts.push(out.rows.len() as u64),
            }
        }
        Ok(counts)
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<()>;

    fn autocommit(&self) -> bool;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Releases the underlying connection. Further calls must fail.
    fn close(&mut self) -> Result<()>;
}

/// Turns a connection descriptor into a live session.
pub trait SessionProvider: Send + Sync {
    /// Fails with `DatasourceUnavailable` when the descriptor does not resolve.
    fn open_session(&self, descriptor: &DataSourceDescriptor) -> Result<Box<dyn DatabaseSession>>;
}
