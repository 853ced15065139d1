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

//! Command-line front end: submits one request, streams its results as JSON
//! lines, and resolves any transaction the task leaves open.

use clap::Parser;
use db_task_engine::application::registry::TaskRegistry;
use db_task_engine::config::{AppConfig, CliArgs, PendingAction};
use db_task_engine::domain::entities::{ControlResponse, TaskStatus};
use db_task_engine::domain::errors::{Result, TaskError};
use db_task_engine::domain::requests::Operation;
use db_task_engine::infrastructure::oracle::provider::OracleSessionProvider;
use db_task_engine::infrastructure::sinks::FileSinkFactory;
use db_task_engine::infrastructure::sources::FileSourceFactory;
use log::{error, info};
use serde::Serialize;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Cannot serialize output: {}", e),
    }
}

/// Reads the request file, filling in the configured datasource when the
/// request has none.
fn load_operation(path: &str, config: &AppConfig) -> Result<Operation> {
    let text = std::fs::read_to_string(path)?;
    let mut body: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| TaskError::InvalidRequest(format!("{}: {}", path, e)))?;

    if let (Some(obj), Some(ds)) = (body.as_object_mut(), config.datasource.as_ref()) {
        if !obj.contains_key("datasource") {
            obj.insert("datasource".to_string(), serde_json::to_value(ds)?);
        }
    }
    serde_json::from_value(body).map_err(|e| TaskError::InvalidRequest(e.to_string()))
}

fn run(args: &CliArgs, config: AppConfig) -> Result<TaskStatus> {
    let operation = load_operation(&args.request, &config)?;

    let registry = TaskRegistry::new(
        config.engine.clone(),
        Arc::new(OracleSessionProvider::new(config.pool.clone())),
        Arc::new(FileSinkFactory),
        Arc::new(FileSourceFactory),
    );

    let submitted = registry.submit(operation)?;
    print_json(&submitted);
    let id = submitted.id;

    let interval = Duration::from_millis(args.poll_interval_ms.max(1));
    let last = loop {
        let mut resp = registry.poll(&id)?;
        for record in resp.data.drain(..) {
            print_json(&record);
        }
        if resp.end_time.is_some() {
            break resp;
        }
        info!("Task {} running: {} ({}/10000)", id, resp.message, resp.progress);
        thread::sleep(interval);
    };
    print_json(&last);

    // Still registered after the final poll means a transaction is waiting.
    if !registry.is_empty() {
        let resolved = match args.pending_action() {
            PendingAction::Commit => registry.commit(&id),
            PendingAction::Rollback => {
                if !args.rollback {
                    info!("No --commit given; rolling back task {}", id);
                }
                registry.rollback(&id)
            }
        };
        match resolved {
            Ok(resp) => print_json(&resp),
            Err(e) => {
                print_json(&ControlResponse::from_error(Some(id.clone()), &e));
                registry.shutdown();
                return Err(e);
            }
        }
    }
    registry.shutdown();
    Ok(last.status)
}

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match &args.config {
        Some(config_path) => match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Submit, poll, resolve
    match run(&args, config) {
        Ok(TaskStatus::Success) => {}
        Ok(status) => {
            error!("Task ended with status {:?}", status);
            process::exit(2);
        }
        Err(e) => {
            print_json(&ControlResponse::from_error(None, &e));
            error!("{}", e);
            process::exit(1);
        }
    }
}
