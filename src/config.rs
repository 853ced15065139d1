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

use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::DataSourceDescriptor;
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Used when a submitted request carries no datasource of its own.
    #[serde(default)]
    pub datasource: Option<DataSourceDescriptor>,
}

/// Limits and batch sizes of the task engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub max_live_tasks: usize,
    pub result_queue_capacity: usize,
    pub page_size: u64,
    pub import_batch_size: usize,
    pub label_max_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_live_tasks: 10,
            result_queue_capacity: 100,
            page_size: 1000,
            import_batch_size: 1000,
            label_max_chars: 30,
        }
    }
}

/// Settings of the r2d2 pool built for each datasource.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: u32,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 2,
            idle_timeout_secs: 60,
            max_lifetime_secs: 60,
            connection_timeout_secs: 30,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the JSON request to submit
    #[arg(short, long)]
    pub request: String,

    /// Commit the transaction left open by a successful transactional task
    #[arg(long, conflicts_with = "rollback")]
    pub commit: bool,

    /// Roll back the open transaction (the default)
    #[arg(long)]
    pub rollback: bool,

    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub max_tasks: Option<usize>,
    #[arg(long)]
    pub page_size: Option<u64>,
}

/// What the CLI does with a transaction a finished task leaves open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Commit,
    Rollback,
}

impl CliArgs {
    /// `--commit` and `--rollback` are exclusive; with neither the
    /// transaction is rolled back.
    pub fn pending_action(&self) -> PendingAction {
        if self.commit && !self.rollback {
            PendingAction::Commit
        } else {
            PendingAction::Rollback
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| TaskError::Config(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| TaskError::Config(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(n) = args.max_tasks { self.engine.max_live_tasks = n; }
        if let Some(n) = args.page_size { self.engine.page_size = n; }
    }

    pub fn validate(&self) -> Result<()> {
        let e = &self.engine;
        if e.max_live_tasks == 0 {
            return Err(TaskError::Config("engine.max_live_tasks must be at least 1".into()));
        }
        if e.result_queue_capacity == 0 {
            return Err(TaskError::Config("engine.result_queue_capacity must be at least 1".into()));
        }
        if e.page_size == 0 || e.import_batch_size == 0 {
            return Err(TaskError::Config("engine.page_size and engine.import_batch_size must be at least 1".into()));
        }
        if self.pool.max_size == 0 {
            return Err(TaskError::Config("pool.max_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_yaml_config() {
        let yaml = r#"
engine:
  max_live_tasks: 4
  page_size: 250
pool:
  max_size: 8
datasource:
  name: "local"
  type: "oracle"
  host: "localhost"
  port: 1521
  username: "scott"
  database: "XE"
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "{}", yaml).unwrap();
        let path = file.path().to_str().unwrap();

        let config = AppConfig::from_file(path).expect("Failed to parse config");

        assert_eq!(config.engine.max_live_tasks, 4);
        assert_eq!(config.engine.page_size, 250);
        assert_eq!(config.engine.import_batch_size, 1000);
        assert_eq!(config.pool.max_size, 8);
        assert_eq!(config.pool.idle_timeout_secs, 60);
        assert_eq!(config.datasource.as_ref().map(|d| d.kind.as_str()), Some("oracle"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"engine": {{"result_queue_capacity": 5}}}}"#).unwrap();
        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.engine.result_queue_capacity, 5);
        assert_eq!(config.engine.max_live_tasks, 10);
        assert!(config.datasource.is_none());
    }

    #[test]
    fn test_bad_config_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "engine: [not, a, map]").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path().to_str().unwrap()),
            Err(TaskError::Config(_))
        ));
    }

    #[test]
    fn test_merge_cli_and_validate() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from(["db-task-engine", "--request", "req.json", "--max-tasks", "0"]);
        config.merge_cli(&args);
        assert_eq!(config.engine.max_live_tasks, 0);
        assert!(matches!(config.validate(), Err(TaskError::Config(_))));
        assert_eq!(args.pending_action(), PendingAction::Rollback);
        assert_eq!(args.poll_interval_ms, 500);
    }

    #[test]
    fn test_pending_action_flags() {
        let commit = CliArgs::parse_from(["db-task-engine", "-r", "req.json", "--commit"]);
        assert_eq!(commit.pending_action(), PendingAction::Commit);
        let rollback = CliArgs::parse_from(["db-task-engine", "-r", "req.json", "--rollback"]);
        assert_eq!(rollback.pending_action(), PendingAction::Rollback);
        assert!(CliArgs::try_parse_from(["db-task-engine", "-r", "req.json", "--commit", "--rollback"]).is_err());
    }
}
