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

//! # Oracle Session Provider
//!
//! Resolves a `DataSourceDescriptor` into a pooled Oracle session. One r2d2
//! pool is built per `(name, database)` key on first use and kept for the
//! life of the provider.

use crate::config::PoolConfig;
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::DataSourceDescriptor;
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::session::OracleSession;
use crate::ports::session_port::{DatabaseSession, SessionProvider};
use log::info;
use parking_lot::Mutex;
use r2d2::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ORACLE_KIND: &str = "oracle";

pub struct OracleSessionProvider {
    pool_config: PoolConfig,
    pools: Mutex<HashMap<String, Arc<Pool<OracleConnectionManager>>>>,
}

impl OracleSessionProvider {
    pub fn new(pool_config: PoolConfig) -> Self {
        Self {
            pool_config,
            pools: Mutex::new(HashMap::new()),
        }
    }

    fn pool_for(&self, ds: &DataSourceDescriptor) -> Result<Arc<Pool<OracleConnectionManager>>> {
        let key = ds.pool_key();
        if let Some(pool) = self.pools.lock().get(&key) {
            return Ok(Arc::clone(pool));
        }

        // The descriptor's password wins; the environment is the fallback.
        let password = ds
            .password
            .clone()
            .or_else(|| std::env::var("DB_PASSWORD").ok())
            .unwrap_or_default();
        let conn_str = ds.connect_string();

        info!("Initializing connection pool {} for {}...", key, conn_str);
        let manager = OracleConnectionManager::new(&ds.username, &password, &conn_str);
        let cfg = &self.pool_config;
        let pool = Pool::builder()
            .max_size(cfg.max_size)
            .idle_timeout(Some(Duration::from_secs(cfg.idle_timeout_secs)))
            .max_lifetime(Some(Duration::from_secs(cfg.max_lifetime_secs)))
            .connection_timeout(Duration::from_secs(cfg.connection_timeout_secs))
            .build(manager)
            .map_err(|e| {
                TaskError::DatasourceUnavailable(format!("{}: cannot create pool: {}", ds.name, e))
            })?;

        // A concurrent first use may have won the race; keep whichever landed first.
        let mut pools = self.pools.lock();
        let pool = pools.entry(key).or_insert_with(|| Arc::new(pool));
        Ok(Arc::clone(pool))
    }
}

impl SessionProvider for OracleSessionProvider {
    fn open_session(&self, descriptor: &DataSourceDescriptor) -> Result<Box<dyn DatabaseSession>> {
        if !descriptor.kind.eq_ignore_ascii_case(ORACLE_KIND) {
            return Err(TaskError::DatasourceUnavailable(format!(
                "{}: unsupported database kind '{}'",
                descriptor.name, descriptor.kind
            )));
        }
        let pool = self.pool_for(descriptor)?;
        let conn = pool.get().map_err(|e| {
            TaskError::DatasourceUnavailable(format!("{}: {}", descriptor.name, e))
        })?;
        Ok(Box::new(OracleSession::new(conn)))
    }
}
