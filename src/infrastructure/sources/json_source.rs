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
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A top-level array of objects, or a single object.
pub struct JsonRowSource {
    total: u64,
    items: std::vec::IntoIter<Value>,
}

impl JsonRowSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let doc: Value = serde_json::from_reader(BufReader::new(file))?;
        let items = match doc {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            _ => {
                return Err(TaskError::Source(format!(
                    "{}: expected an array of objects",
                    path.display()
                )))
            }
        };
        Ok(Self {
            total: items.len() as u64,
            items: items.into_iter(),
        })
    }
}

impl Iterator for JsonRowSource {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|item| match item {
            Value::Object(map) => Ok(SourceRow::Keyed(map)),
            other => Err(TaskError::Source(format!("expected an object, found {}", other))),
        })
    }
}

impl RowSource for JsonRowSource {
    fn total_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(text: &str) -> Result<JsonRowSource> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", text).unwrap();
        JsonRowSource::open(file.path())
    }

    #[test]
    fn test_array_of_objects() {
        let src = source(r#"[{"ID": 1}, {"ID": 2}, 3]"#).unwrap();
        assert_eq!(src.total_hint(), Some(3));
        let items: Vec<Result<SourceRow>> = src.collect();
        assert!(matches!(&items[0], Ok(SourceRow::Keyed(m)) if m["ID"] == 1));
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(TaskError::Source(_))));
    }

    #[test]
    fn test_single_object_and_scalar_document() {
        assert_eq!(source(r#"{"ID": 1}"#).unwrap().total_hint(), Some(1));
        assert!(matches!(source("42"), Err(TaskError::Source(_))));
    }
}
