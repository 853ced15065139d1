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

//! File-backed row sinks, one per dump format.

pub mod csv_sink;
pub mod json_sink;
pub mod sql_sink;
pub mod xlsx_sink;

use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::DumpFormat;
use crate::ports::row_sink::{RowSink, SinkFactory, SinkSpec};
use flate2::write::GzEncoder;
use flate2::Compression as GzipCompression;
use log::info;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Opens the sink matching the requested format under `spec.dir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn RowSink>> {
        fs::create_dir_all(&spec.dir)
            .map_err(|e| TaskError::Sink(format!("cannot create {}: {}", spec.dir.display(), e)))?;
        Ok(match spec.format {
            DumpFormat::Sql => Box::new(sql_sink::SqlFileSink::create(spec)?),
            DumpFormat::Csv => Box::new(csv_sink::CsvFileSink::new(spec)),
            DumpFormat::Json => Box::new(json_sink::JsonFileSink::new(spec)),
            DumpFormat::Xlsx => Box::new(xlsx_sink::XlsxFileSink::new(spec)),
        })
    }
}

/// `<file_name>.<ext>`, or `<file_name>_<table>.<ext>` when the dump writes
/// one file per table and covers several tables. `.gz` is appended when
/// compressing.
pub(crate) fn output_path(spec: &SinkSpec, table: Option<&str>, ext: &str) -> PathBuf {
    let stem = match table {
        Some(t) if spec.tables.len() > 1 => format!("{}_{}", spec.file_name, t),
        _ => spec.file_name.clone(),
    };
    let name = if spec.compress {
        format!("{}.{}.gz", stem, ext)
    } else {
        format!("{}.{}", stem, ext)
    };
    spec.dir.join(name)
}

/// A buffered output file, optionally gzip-compressed.
pub(crate) enum Output {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Output {
    pub(crate) fn create(path: &PathBuf, compress: bool) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| TaskError::Sink(format!("cannot create {}: {}", path.display(), e)))?;
        let buf_writer = BufWriter::with_capacity(128 * 1024, file);
        info!("Writing dump output to {}", path.display());
        Ok(if compress {
            Output::Gzip(GzEncoder::new(buf_writer, GzipCompression::fast()))
        } else {
            Output::Plain(buf_writer)
        })
    }

    /// Flushes everything, writing the gzip trailer when compressing.
    pub(crate) fn finish(self) -> Result<()> {
        match self {
            Output::Plain(mut w) => w.flush()?,
            Output::Gzip(enc) => enc.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Plain(w) => w.write(buf),
            Output::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(w) => w.flush(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::entities::{ColumnMeta, Value};
    use std::path::Path;

    pub(crate) fn spec(dir: &Path, format: DumpFormat, tables: &[&str]) -> SinkSpec {
        SinkSpec {
            format,
            dir: dir.to_path_buf(),
            file_name: "dump".into(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            field_types: Vec::new(),
            identifier_quote: "\"".into(),
            compress: false,
        }
    }

    pub(crate) fn columns() -> Vec<ColumnMeta> {
        vec![ColumnMeta::new("ID", "NUMBER"), ColumnMeta::new("NAME", "VARCHAR2")]
    }

    pub(crate) fn rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::Int(1), Value::Text("a,b".into())],
            vec![Value::Int(2), Value::Null],
        ]
    }

    #[test]
    fn test_output_path() {
        let dir = Path::new("/out");
        let single = spec(dir, DumpFormat::Csv, &["T1"]);
        assert_eq!(output_path(&single, Some("T1"), "csv"), dir.join("dump.csv"));

        let mut multi = spec(dir, DumpFormat::Csv, &["T1", "T2"]);
        assert_eq!(output_path(&multi, Some("T2"), "csv"), dir.join("dump_T2.csv"));
        multi.compress = true;
        assert_eq!(output_path(&multi, Some("T2"), "csv"), dir.join("dump_T2.csv.gz"));
        assert_eq!(output_path(&multi, None, "sql"), dir.join("dump.sql.gz"));
    }

    #[test]
    fn test_factory_rejects_unwritable_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let s = spec(&blocker.join("sub"), DumpFormat::Sql, &["T1"]);
        assert!(matches!(FileSinkFactory.open(&s), Err(TaskError::Sink(_))));
    }
}
