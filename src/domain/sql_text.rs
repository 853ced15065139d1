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

//! Centralized text helpers for the SQL the workers generate.
//!
//! Statement splitting, identifier quoting, template expansion and the
//! type-aware literal rendering shared by the SQL dump sink and the import
//! worker all live here, so that an exported `INSERT` and an imported one are
//! built by the exact same rules.

use crate::domain::entities::Value;
use crate::domain::errors::{Result, TaskError};
use crate::domain::requests::FieldType;

/// Literal categories whose values are written without quotes.
const UNQUOTED_CATALOGS: [&str; 6] = [
    "Integer",
    "Fixed-Point",
    "Floating-Point",
    "Binary",
    "Bit-Value",
    "Enumeration",
];

/// Categories that must hold a number when a value is imported.
const NUMERIC_CATALOGS: [&str; 3] = ["Integer", "Fixed-Point", "Floating-Point"];

/// Splits submitted text into statements. Blank fragments are dropped.
pub fn split_statements(sql: &str, delimiter: &str) -> Vec<String> {
    sql.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Short human description of a statement: the first `max_chars` characters.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Wraps an identifier in `quote`, doubling any embedded quote characters.
pub fn quote_identifier(name: &str, quote: &str) -> String {
    if quote.is_empty() {
        return name.to_string();
    }
    let doubled = format!("{}{}", quote, quote);
    format!("{}{}{}", quote, name.replace(quote, &doubled), quote)
}

/// Expands `{table}` in a request-supplied template.
pub fn render_table_template(template: &str, table: &str) -> String {
    template.replace("{table}", table)
}

/// Expands `{1}` (offset) and `{2}` (window size) in a paging clause.
pub fn render_page_clause(template: &str, offset: u64, limit: u64) -> String {
    template
        .replace("{1}", &offset.to_string())
        .replace("{2}", &limit.to_string())
}

pub fn is_unquoted_catalog(catalog: &str) -> bool {
    UNQUOTED_CATALOGS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(catalog.trim()))
}

fn is_numeric_catalog(catalog: &str) -> bool {
    NUMERIC_CATALOGS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(catalog.trim()))
}

/// Looks up the literal category of a database type; unknown types are `String`.
pub fn catalog_for<'a>(type_name: &str, field_types: &'a [FieldType]) -> &'a str {
    field_types
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(type_name))
        .map(|f| f.catalog.as_str())
        .unwrap_or("String")
}

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Renders one exported cell as an SQL literal.
pub fn format_literal(value: &Value, unquoted: bool) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bytes(b) if unquoted => {
            let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
            format!("0x{}", hex)
        }
        Value::Bool(b) if unquoted => (if *b { "1" } else { "0" }).to_string(),
        other => {
            let text = other.to_text().unwrap_or_default();
            if unquoted {
                text
            } else {
                quote_literal(&text)
            }
        }
    }
}

/// Renders one imported cell as an SQL literal.
///
/// Numeric categories must parse as a number; an empty numeric cell is `NULL`.
pub fn import_literal(raw: Option<&str>, catalog: Option<&str>) -> Result<String> {
    let Some(raw) = raw else {
        return Ok("NULL".to_string());
    };
    match catalog {
        Some(c) if is_numeric_catalog(c) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Ok("NULL".to_string())
            } else if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
                Ok(trimmed.to_string())
            } else {
                Err(TaskError::Execution(format!(
                    "value '{}' is not a valid {} literal",
                    raw, c
                )))
            }
        }
        Some(c) if is_unquoted_catalog(c) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Ok("NULL".to_string())
            } else {
                Ok(quote_literal(trimmed))
            }
        }
        _ => Ok(quote_literal(raw)),
    }
}

/// `INSERT INTO <table> (<cols>) VALUES (` prefix for generated statements.
pub fn insert_prefix(table: &str, columns: &[&str], quote: &str) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_identifier(c, quote)).collect();
    format!("INSERT INTO {} ({}) VALUES (", table, cols.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements() {
        assert_eq!(
            split_statements("SELECT 1;SELECT 2", ";"),
            vec!["SELECT 1".to_string(), "SELECT 2".to_string()]
        );
        assert_eq!(split_statements(" ;; UPDATE t SET a=1 ; ", ";").len(), 1);
        assert_eq!(split_statements("a/b", "/"), vec!["a", "b"]);
    }

    #[test]
    fn test_truncate_label() {
        let sql = "SELECT * FROM really_long_table_name WHERE x = 1";
        let label = truncate_label(sql, 30);
        assert_eq!(label, "SELECT * FROM really_long_tabl...");
        assert_eq!(truncate_label("SELECT 1", 30), "SELECT 1");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("COL", "\""), "\"COL\"");
        assert_eq!(quote_identifier("a`b", "`"), "`a``b`");
        assert_eq!(quote_identifier("plain", ""), "plain");
    }

    #[test]
    fn test_page_clause() {
        assert_eq!(
            render_page_clause("LIMIT {2} OFFSET {1}", 2000, 500),
            "LIMIT 500 OFFSET 2000"
        );
        assert_eq!(
            render_page_clause("OFFSET {1} ROWS FETCH NEXT {2} ROWS ONLY", 0, 1000),
            "OFFSET 0 ROWS FETCH NEXT 1000 ROWS ONLY"
        );
    }

    #[test]
    fn test_format_literal_is_type_aware() {
        assert_eq!(format_literal(&Value::Int(42), true), "42");
        assert_eq!(format_literal(&Value::Text("42".into()), true), "42");
        assert_eq!(format_literal(&Value::Text("O'Brien".into()), false), "'O''Brien'");
        assert_eq!(format_literal(&Value::Null, false), "NULL");
        assert_eq!(format_literal(&Value::Bytes(vec![1, 255]), true), "0x01FF");
    }

    #[test]
    fn test_catalog_lookup() {
        let types = vec![
            FieldType { name: "INT".into(), catalog: "Integer".into() },
            FieldType { name: "ENUM".into(), catalog: "Enumeration".into() },
        ];
        assert!(is_unquoted_catalog(catalog_for("int", &types)));
        assert!(is_unquoted_catalog(catalog_for("ENUM", &types)));
        assert!(!is_unquoted_catalog(catalog_for("VARCHAR", &types)));
        assert!(!is_unquoted_catalog(""));
    }

    #[test]
    fn test_import_literal() {
        assert_eq!(import_literal(Some("12.5"), Some("Fixed-Point")).unwrap(), "12.5");
        assert_eq!(import_literal(Some(""), Some("Integer")).unwrap(), "NULL");
        assert_eq!(import_literal(None, None).unwrap(), "NULL");
        assert_eq!(import_literal(Some("it's"), None).unwrap(), "'it''s'");
        assert!(import_literal(Some("12; DROP TABLE x"), Some("Integer")).is_err());
    }

    #[test]
    fn test_import_literal_rejects_non_finite_numbers() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(import_literal(Some(raw), Some("Floating-Point")).is_err(), "{}", raw);
        }
        assert_eq!(import_literal(Some("-1e3"), Some("Floating-Point")).unwrap(), "-1e3");
    }

    #[test]
    fn test_insert_prefix() {
        assert_eq!(
            insert_prefix("EMP", &["ID", "NAME"], "\""),
            "INSERT INTO EMP (\"ID\",\"NAME\") VALUES ("
        );
    }
}
