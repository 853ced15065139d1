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

//! # Submission Requests
//!
//! The body a client submits is a `kind`-tagged JSON object. This module
//! holds the typed form of each kind plus the connection descriptor that
//! every request carries.

use crate::domain::errors::{Result, TaskError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How to reach a database. Resolved and pooled by a `SessionProvider`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    /// Logical name shown in task labels.
    pub name: String,
    /// Database kind (e.g. `oracle`).
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Database, service or schema name.
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl DataSourceDescriptor {
    /// Key under which a pool for this descriptor is cached.
    pub fn pool_key(&self) -> String {
        format!("{}:{}", self.name, self.database)
    }

    /// Easy Connect string, unless an explicit `connect_string` param is given.
    pub fn connect_string(&self) -> String {
        match self.params.get("connect_string") {
            Some(s) => s.clone(),
            None => format!("//{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// One submitted operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Sql(SqlRequest),
    Dump(DumpRequest),
    Import(ImportRequest),
}

impl Operation {
    /// Parses a submission body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| TaskError::InvalidRequest(e.to_string()))
    }

    /// Rejects requests that could never run, before any registry entry exists.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Sql(r) => {
                if r.sql.trim().is_empty() {
                    return Err(TaskError::InvalidRequest("sql is required".into()));
                }
                if r.delimiter.is_empty() {
                    return Err(TaskError::InvalidRequest("delimiter must not be empty".into()));
                }
            }
            Operation::Dump(r) => {
                if r.tables.is_empty() {
                    return Err(TaskError::InvalidRequest("tables must not be empty".into()));
                }
                if r.file_name.trim().is_empty() {
                    return Err(TaskError::InvalidRequest("fileName is required".into()));
                }
            }
            Operation::Import(r) => {
                if r.table.trim().is_empty() {
                    return Err(TaskError::InvalidRequest("table is required".into()));
                }
                if r.mapping.is_empty() {
                    return Err(TaskError::InvalidRequest("mapping must not be empty".into()));
                }
                r.source_format()?;
            }
        }
        Ok(())
    }
}

fn default_delimiter() -> String {
    ";".to_string()
}

/// Ad-hoc, possibly multi-statement SQL.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlRequest {
    pub datasource: DataSourceDescriptor,
    pub sql: String,
    #[serde(default)]
    pub transaction: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// What part of each table a dump writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DumpMode {
    #[serde(rename = "s", alias = "structure")]
    Structure,
    #[serde(rename = "d", alias = "data")]
    Data,
    #[default]
    #[serde(rename = "sd", alias = "both")]
    Both,
}

impl DumpMode {
    pub fn includes_structure(&self) -> bool {
        matches!(self, DumpMode::Structure | DumpMode::Both)
    }

    pub fn includes_data(&self) -> bool {
        matches!(self, DumpMode::Data | DumpMode::Both)
    }
}

/// Output format of a dump.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    Sql,
    Csv,
    Json,
    /// One workbook, one worksheet per table.
    #[serde(alias = "excel")]
    Xlsx,
}

/// Maps a database type name onto a literal category (`Integer`, `String`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldType {
    pub name: String,
    pub catalog: String,
}

/// Table export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequest {
    pub datasource: DataSourceDescriptor,
    pub tables: Vec<String>,
    #[serde(default, alias = "dumpType")]
    pub mode: DumpMode,
    #[serde(alias = "fileType")]
    pub format: DumpFormat,
    pub path: PathBuf,
    pub file_name: String,
    /// `{table}` is replaced by the table name.
    #[serde(default)]
    pub drop_table_sql: Option<String>,
    /// `{table}` is replaced; the DDL is the second column of the first row.
    #[serde(default)]
    pub ddl_sql: Option<String>,
    /// `{1}` is replaced by the offset and `{2}` by the window size.
    #[serde(default)]
    pub page_sql: Option<String>,
    #[serde(default)]
    pub field_types: Vec<FieldType>,
    #[serde(default, alias = "identifierQuoteSymbol")]
    pub identifier_quote: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

impl DumpRequest {
    /// Structure is only representable in SQL text; other formats get data only.
    pub fn effective_mode(&self) -> DumpMode {
        match self.format {
            DumpFormat::Sql => self.mode,
            DumpFormat::Csv | DumpFormat::Json | DumpFormat::Xlsx => DumpMode::Data,
        }
    }
}

/// Input file format of an import.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    /// First worksheet of a workbook; the first row is the header.
    Xlsx,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            "xlsx" => Some(SourceFormat::Xlsx),
            _ => None,
        }
    }
}

/// Binds a source column (by position, or by name for keyed records) to a
/// destination column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub index: usize,
    pub name: String,
    #[serde(default)]
    pub catalog: Option<String>,
}

/// File-based import into one table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub datasource: DataSourceDescriptor,
    pub path: PathBuf,
    pub table: String,
    pub mapping: Vec<ColumnMapping>,
    #[serde(default, alias = "isClear")]
    pub clear: bool,
    #[serde(default)]
    pub clear_table_sql: Option<String>,
    #[serde(default, alias = "identifierQuoteSymbol")]
    pub identifier_quote: Option<String>,
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default)]
    pub delimiter: Option<char>,
}

impl ImportRequest {
    pub fn source_format(&self) -> Result<SourceFormat> {
        self.format
            .or_else(|| SourceFormat::from_path(&self.path))
            .ok_or_else(|| {
                TaskError::InvalidRequest(format!(
                    "unsupported source file format: {}",
                    self.path.display()
                ))
            })
    }
}
