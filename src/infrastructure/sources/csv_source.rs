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
use crate::ports::row_source::{RowSource, SourceRow};
use csv::{ByteRecord, Reader, ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::Path;

/// Delimited text with a header row. Rows whose field count differs from the
/// header are reported as errors.
pub struct CsvRowSource {
    total: u64,
    records: StringRecordsIntoIter<File>,
}

fn reader(path: &Path, delimiter: u8, flexible: bool) -> Result<Reader<File>> {
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(flexible)
        .delimiter(delimiter)
        .from_path(path)?)
}

impl CsvRowSource {
    /// Opens `path` after one counting pass over its records.
    pub fn open(path: &Path, delimiter: Option<char>) -> Result<Self> {
        let delimiter = delimiter.unwrap_or(',');
        if !delimiter.is_ascii() {
            return Err(TaskError::Source(format!(
                "delimiter '{}' is not a single-byte character",
                delimiter
            )));
        }
        let delimiter = delimiter as u8;

        // Ragged rows still count; they fail on the reading pass.
        let mut counter = reader(path, delimiter, true)?;
        let mut record = ByteRecord::new();
        let mut total = 0u64;
        while counter.read_byte_record(&mut record).unwrap_or(false) {
            total += 1;
        }

        Ok(Self {
            total,
            records: reader(path, delimiter, false)?.into_records(),
        })
    }
}

impl Iterator for CsvRowSource {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|res| {
            res.map(|record| SourceRow::Positional(record.iter().map(str::to_string).collect()))
                .map_err(TaskError::from)
        })
    }
}

impl RowSource for CsvRowSource {
    fn total_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_rows_after_header() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id;name\n1;alice\n2;bob\n").unwrap();
        let rows: Vec<SourceRow> = CsvRowSource::open(file.path(), Some(';'))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            rows,
            vec![
                SourceRow::Positional(vec!["1".into(), "alice".into()]),
                SourceRow::Positional(vec!["2".into(), "bob".into()]),
            ]
        );
    }

    #[test]
    fn test_ragged_row_is_error() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id,name\n1,alice\n2\n").unwrap();
        let mut source = CsvRowSource::open(file.path(), None).unwrap();
        assert_eq!(source.total_hint(), Some(2));
        assert!(source.next().unwrap().is_ok());
        assert!(matches!(source.next(), Some(Err(TaskError::Csv(_)))));
    }

    #[test]
    fn test_total_hint_counts_data_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id\n1\n2\n3\n").unwrap();
        let source = CsvRowSource::open(file.path(), None).unwrap();
        assert_eq!(source.total_hint(), Some(3));
        assert_eq!(source.count(), 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(CsvRowSource::open(Path::new("/nonexistent/in.csv"), None).is_err());
    }
}
