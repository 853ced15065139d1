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

//! `DatabaseSession` over a pooled Oracle connection.
//!
//! Query results are fully materialized; every cell is converted into a
//! domain `Value` according to its `OracleType`.

use crate::domain::entities::{ColumnMeta, Value};
use crate::domain::errors::{Result, TaskError};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::ports::session_port::{DatabaseSession, ExecOutcome, QueryOutput};
use log::{debug, warn};
use oracle::sql_type::{OracleType, Timestamp};
use oracle::Row;
use r2d2::PooledConnection;

type PooledOracle = PooledConnection<OracleConnectionManager>;

pub struct OracleSession {
    conn: Option<PooledOracle>,
    autocommit: bool,
}

impl OracleSession {
    pub fn new(mut conn: PooledOracle) -> Self {
        conn.set_autocommit(true);
        Self {
            conn: Some(conn),
            autocommit: true,
        }
    }

    fn conn(&mut self) -> Result<&mut PooledOracle> {
        self.conn
            .as_mut()
            .ok_or_else(|| TaskError::Execution("session is closed".into()))
    }
}

/// `NUMBER(10,2)` -> `NUMBER`
pub(crate) fn base_type_name(full: &str) -> String {
    full.split('(').next().unwrap_or(full).trim().to_string()
}

pub(crate) fn format_timestamp(ts: &Timestamp) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        ts.nanosecond() / 1000
    )
}

/// Integral numbers become `Int`, binary floats `Float`; decimals keep their
/// exact text.
pub(crate) fn number_value(text: String, binary_float: bool) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        Value::Int(i)
    } else if binary_float {
        text.parse::<f64>().map(Value::Float).unwrap_or(Value::Text(text))
    } else {
        Value::Text(text)
    }
}

fn cell_value(row: &Row, i: usize, otype: &OracleType) -> Result<Value> {
    let value = match otype {
        OracleType::Number(_, _) | OracleType::Int64 | OracleType::UInt64 => {
            let v: Option<String> = row.get(i)?;
            v.map(|s| number_value(s, false))
        }
        OracleType::Float(_) | OracleType::BinaryFloat | OracleType::BinaryDouble => {
            let v: Option<String> = row.get(i)?;
            v.map(|s| number_value(s, true))
        }
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => {
            let v: Option<Timestamp> = row.get(i)?;
            v.map(|ts| Value::Text(format_timestamp(&ts)))
        }
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            let v: Option<Vec<u8>> = row.get(i)?;
            v.map(Value::Bytes)
        }
        OracleType::Boolean => {
            let v: Option<bool> = row.get(i)?;
            v.map(Value::Bool)
        }
        _ => {
            let v: Option<String> = row.get(i)?;
            v.map(Value::Text)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

impl DatabaseSession for OracleSession {
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        let conn = self.conn()?;
        let mut stmt = conn.statement(sql).build()?;

        if stmt.is_query() {
            let rows = stmt.query(&[])?;
            let col_infos = rows.column_info();
            let col_types: Vec<OracleType> =
                col_infos.iter().map(|c| c.oracle_type().clone()).collect();
            let columns: Vec<ColumnMeta> = col_infos
                .iter()
                .map(|c| ColumnMeta::new(c.name(), base_type_name(&c.oracle_type().to_string())))
                .collect();

            let mut out = Vec::new();
            for row_res in rows {
                let row = row_res?;
                let mut record = Vec::with_capacity(col_types.len());
                for (i, otype) in col_types.iter().enumerate() {
                    record.push(cell_value(&row, i, otype)?);
                }
                out.push(record);
            }
            debug!("Query returned {} rows", out.len());
            Ok(ExecOutcome::Rows(QueryOutput {
                columns,
                rows: out,
            }))
        } else {
            stmt.execute(&[])?;
            Ok(ExecOutcome::Updated(stmt.row_count()?))
        }
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        self.conn()?.set_autocommit(enabled);
        self.autocommit = enabled;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn commit(&mut self) -> Result<()> {
        self.conn()?.commit()?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn()?.rollback()?;
        Ok(())
    }

    /// Returns the connection to its pool, discarding uncommitted work.
    fn close(&mut self) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| TaskError::Execution("session is already closed".into()))?;
        if !self.autocommit {
            conn.rollback()?;
            conn.set_autocommit(true);
        }
        Ok(())
    }
}

impl Drop for OracleSession {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if !self.autocommit {
                if let Err(e) = conn.rollback() {
                    warn!("Rollback of abandoned session failed: {}", e);
                }
                conn.set_autocommit(true);
            }
        }
    }
}
