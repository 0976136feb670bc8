//! SQL Utilities Module
//!
//! Query hashing, list-parameter expansion and plain-text formatting for
//! logged statements.

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

// == Hashing ==
/// Length of a query hash in hex characters.
pub const SQL_HASH_LEN: usize = 32;

/// Stable identifier for the text of a query.
///
/// Whitespace runs collapse to a single space before hashing, so the same
/// statement reformatted keeps its hash.
pub fn sql_hash(sql: &str) -> String {
    let normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hash = hex::encode(Sha256::digest(normalized.as_bytes()));
    hash.truncate(SQL_HASH_LEN);
    hash
}

// == Parameter Expansion ==
/// Parameters bound to one statement. JSON arrays are list parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParams {
    Positional(Vec<Value>),
    /// Keys may be written with or without the leading `:`
    Named(BTreeMap<String, Value>),
}

/// A statement rewritten to positional placeholders only.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Rewrites list parameters into one `?` per element.
///
/// An empty list becomes `NULL`. Named placeholders are converted to `?`
/// with their values in order of appearance. Placeholders inside quoted
/// literals (`'..'`, `".."`, `` `..` ``, `[..]`) are left alone.
///
/// # Errors
/// `CacheError::InvalidRequest` when a named placeholder has no value.
pub fn expand_list_parameters(sql: &str, params: &SqlParams) -> Result<ExpandedQuery> {
    match params {
        SqlParams::Positional(values) => Ok(expand_positional(sql, values)),
        SqlParams::Named(values) => expand_named(sql, values),
    }
}

fn expand_positional(sql: &str, values: &[Value]) -> ExpandedQuery {
    if !values.iter().any(Value::is_array) {
        return ExpandedQuery {
            sql: sql.to_string(),
            params: values.to_vec(),
        };
    }

    let mut expanded = String::with_capacity(sql.len());
    let mut params = Vec::with_capacity(values.len());
    let mut copied = 0;
    let mut next = values.iter();

    for position in positional_placeholders(sql) {
        let Some(value) = next.next() else {
            break;
        };
        expanded.push_str(&sql[copied..position]);
        push_placeholder(&mut expanded, &mut params, value);
        copied = position + 1;
    }
    expanded.push_str(&sql[copied..]);
    params.extend(next.cloned());

    ExpandedQuery {
        sql: expanded,
        params,
    }
}

fn expand_named(sql: &str, values: &BTreeMap<String, Value>) -> Result<ExpandedQuery> {
    let mut expanded = String::with_capacity(sql.len());
    let mut params = Vec::with_capacity(values.len());
    let mut copied = 0;

    for (position, name) in named_placeholders(sql) {
        let value = values
            .get(name)
            .or_else(|| values.get(&format!(":{name}")))
            .ok_or_else(|| {
                CacheError::InvalidRequest(format!("Value for :{name} not found in params"))
            })?;

        expanded.push_str(&sql[copied..position]);
        push_placeholder(&mut expanded, &mut params, value);
        copied = position + 1 + name.len();
    }
    expanded.push_str(&sql[copied..]);

    Ok(ExpandedQuery {
        sql: expanded,
        params,
    })
}

fn push_placeholder(sql: &mut String, params: &mut Vec<Value>, value: &Value) {
    match value {
        Value::Array(items) if items.is_empty() => sql.push_str("NULL"),
        Value::Array(items) => {
            sql.push_str(&vec!["?"; items.len()].join(", "));
            params.extend(items.iter().cloned());
        }
        scalar => {
            sql.push('?');
            params.push(scalar.clone());
        }
    }
}

/// Byte offsets of every `?` outside quoted literals.
fn positional_placeholders(sql: &str) -> Vec<usize> {
    unquoted_fragments(sql)
        .into_iter()
        .flat_map(|(offset, fragment)| {
            fragment
                .match_indices('?')
                .map(move |(index, _)| offset + index)
        })
        .collect()
}

/// Offsets and names of `:name` placeholders outside quoted literals.
///
/// `::type` casts are not placeholders.
fn named_placeholders(sql: &str) -> Vec<(usize, &str)> {
    let mut found = Vec::new();
    for (offset, fragment) in unquoted_fragments(sql) {
        let bytes = fragment.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b':' {
                i += 1;
                continue;
            }
            if bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            let start = i + 1;
            let len = fragment[start..]
                .bytes()
                .enumerate()
                .take_while(|(n, b)| {
                    b.is_ascii_alphabetic() || *b == b'_' || (*n > 0 && b.is_ascii_digit())
                })
                .count();
            if len > 0 {
                found.push((offset + i, &fragment[start..start + len]));
            }
            i = start + len;
        }
    }
    found
}

/// Slices of `sql` that lie outside quoted literals, with their offsets.
fn unquoted_fragments(sql: &str) -> Vec<(usize, &str)> {
    let bytes = sql.as_bytes();
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let close = match bytes[i] {
            b'\'' => b'\'',
            b'"' => b'"',
            b'`' => b'`',
            b'[' if !follows_array_keyword(sql, i) => b']',
            _ => {
                i += 1;
                continue;
            }
        };
        if start < i {
            fragments.push((start, &sql[start..i]));
        }
        i = literal_end(bytes, i, close);
        start = i;
    }
    if start < bytes.len() {
        fragments.push((start, &sql[start..]));
    }
    fragments
}

/// Index just past the literal opened at `open`.
fn literal_end(bytes: &[u8], open: usize, close: u8) -> usize {
    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' if close != b']' => j += 2,
            b'\'' if close == b'\'' && bytes.get(j + 1) == Some(&b'\'') => j += 2,
            b if b == close => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// `ARRAY[...]` is an array constructor, not a bracket-quoted name.
fn follows_array_keyword(sql: &str, bracket: usize) -> bool {
    bracket >= 5
        && sql
            .get(bracket - 5..bracket)
            .is_some_and(|word| word.eq_ignore_ascii_case("array"))
}

// == Formatting ==
/// Keywords that start a new line when formatting.
const CLAUSE_KEYWORDS: &str = r"SELECT|(?:ON\s+DUPLICATE\s+KEY\s+)?UPDATE|INSERT(?:\s+INTO)?|REPLACE(?:\s+INTO)?|DELETE|CALL|UNION|FROM|WHERE|HAVING|GROUP\s+BY|ORDER\s+BY|LIMIT|OFFSET|SET|VALUES|LEFT\s+JOIN|INNER\s+JOIN|TRUNCATE";

/// Default line width of formatted SQL.
pub const FORMAT_WIDTH: usize = 100;

/// Lays a statement out one clause per line for logs.
#[derive(Debug, Clone)]
pub struct SqlFormatter {
    clause: Regex,
    spaces: Regex,
    blank_lines: Regex,
    width: usize,
}

impl SqlFormatter {
    pub fn new() -> Result<Self> {
        Self::with_width(FORMAT_WIDTH)
    }

    pub fn with_width(width: usize) -> Result<Self> {
        Ok(Self {
            clause: Regex::new(&format!(r"(?i)\b(?:{CLAUSE_KEYWORDS})\b"))?,
            spaces: Regex::new(r"[ \t]{2,}")?,
            blank_lines: Regex::new(r"([ \t]*\r?\n){2,}")?,
            width: width.max(1),
        })
    }

    /// Breaks before each clause keyword, squeezes spaces and wraps long lines.
    pub fn format(&self, sql: &str) -> String {
        let padded = format!(" {sql} ");
        let broken = self.clause.replace_all(&padded, |caps: &Captures| {
            let Some(keyword) = caps.get(0) else {
                return String::new();
            };
            let before = padded[..keyword.start()].chars().next_back();
            let after = padded[keyword.end()..].chars().next();
            let opens = before.is_some_and(|c| c.is_whitespace() || c == ',' || c == '(');
            let closes = after.is_some_and(|c| c.is_whitespace() || c == ',' || c == ')');

            if opens && closes {
                format!("\n{}", keyword.as_str())
            } else {
                keyword.as_str().to_string()
            }
        });
        let squeezed = self.spaces.replace_all(&broken, " ");

        let wrapped = squeezed
            .lines()
            .map(|line| wrap_line(line, self.width))
            .collect::<Vec<_>>()
            .join("\n");
        let compact = self.blank_lines.replace_all(&wrapped, "\n");

        compact
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Greedy word wrap; words longer than `width` stay whole.
fn wrap_line(line: &str, width: usize) -> String {
    let mut wrapped = String::with_capacity(line.len());
    let mut column = 0;

    for (index, word) in line.split(' ').enumerate() {
        if index > 0 {
            if column > 0 && column + 1 + word.len() > width {
                wrapped.push('\n');
                column = 0;
            } else {
                wrapped.push(' ');
                column += 1;
            }
        }
        wrapped.push_str(word);
        column += word.len();
    }
    wrapped
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_hash_ignores_layout() {
        let hash = sql_hash("SELECT *  FROM users\n WHERE id = ?");
        assert_eq!(hash.len(), SQL_HASH_LEN);
        assert_eq!(hash, sql_hash("SELECT * FROM users WHERE id = ?"));
        assert_ne!(hash, sql_hash("SELECT * FROM users WHERE id = 1"));
    }

    #[test]
    fn test_positional_without_lists_is_unchanged() {
        let params = SqlParams::Positional(vec![json!(1), json!("a")]);
        let expanded = expand_list_parameters("SELECT ? , ?", &params).unwrap();

        assert_eq!(expanded.sql, "SELECT ? , ?");
        assert_eq!(expanded.params, vec![json!(1), json!("a")]);
    }

    #[test]
    fn test_positional_list_expands() {
        let params = SqlParams::Positional(vec![json!(7), json!([1, 2, 3]), json!("x")]);
        let expanded = expand_list_parameters(
            "SELECT * FROM t WHERE a = ? AND id IN (?) AND b = ?",
            &params,
        )
        .unwrap();

        assert_eq!(
            expanded.sql,
            "SELECT * FROM t WHERE a = ? AND id IN (?, ?, ?) AND b = ?"
        );
        assert_eq!(
            expanded.params,
            vec![json!(7), json!(1), json!(2), json!(3), json!("x")]
        );
    }

    #[test]
    fn test_empty_list_becomes_null() {
        let params = SqlParams::Positional(vec![json!([])]);
        let expanded = expand_list_parameters("SELECT 1 WHERE id IN (?)", &params).unwrap();

        assert_eq!(expanded.sql, "SELECT 1 WHERE id IN (NULL)");
        assert!(expanded.params.is_empty());
    }

    #[test]
    fn test_quoted_question_marks_are_ignored() {
        let params = SqlParams::Positional(vec![json!([1, 2])]);
        let expanded = expand_list_parameters(
            r#"SELECT '?', "?", `?`, [?], 'it''s ?' FROM t WHERE id IN (?)"#,
            &params,
        )
        .unwrap();

        assert_eq!(
            expanded.sql,
            r#"SELECT '?', "?", `?`, [?], 'it''s ?' FROM t WHERE id IN (?, ?)"#
        );
    }

    #[test]
    fn test_named_parameters_become_positional() {
        let params = SqlParams::Named(BTreeMap::from([
            ("ids".to_string(), json!([4, 5])),
            (":name".to_string(), json!("bob")),
        ]));
        let expanded = expand_list_parameters(
            "SELECT x::int FROM t WHERE name = :name AND id IN (:ids) AND ':skip' <> ''",
            &params,
        )
        .unwrap();

        assert_eq!(
            expanded.sql,
            "SELECT x::int FROM t WHERE name = ? AND id IN (?, ?) AND ':skip' <> ''"
        );
        assert_eq!(expanded.params, vec![json!("bob"), json!(4), json!(5)]);
    }

    #[test]
    fn test_missing_named_parameter_fails() {
        let params = SqlParams::Named(BTreeMap::new());
        let result = expand_list_parameters("SELECT :missing", &params);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_array_constructor_is_not_quoted() {
        let params = SqlParams::Positional(vec![json!([1, 2])]);
        let expanded = expand_list_parameters("SELECT ARRAY[?]", &params).unwrap();
        assert_eq!(expanded.sql, "SELECT ARRAY[?, ?]");
    }

    #[test]
    fn test_format_breaks_clauses() {
        let formatter = SqlFormatter::new().unwrap();
        let formatted =
            formatter.format("SELECT a,  b FROM users u LEFT JOIN roles r ON r.id = u.role WHERE u.id = ? ORDER BY a");

        assert_eq!(
            formatted,
            "SELECT a, b\nFROM users u\nLEFT JOIN roles r ON r.id = u.role\nWHERE u.id = ?\nORDER BY a"
        );
    }

    #[test]
    fn test_format_leaves_identifiers_alone() {
        let formatter = SqlFormatter::new().unwrap();
        assert_eq!(
            formatter.format("UPDATE t SET offset_from = 1"),
            "UPDATE t\nSET offset_from = 1"
        );
    }

    #[test]
    fn test_format_wraps_long_lines() {
        let formatter = SqlFormatter::with_width(20).unwrap();
        let formatted = formatter.format("SELECT alpha, beta, gamma, delta, epsilon");

        assert!(formatted.lines().count() > 1);
        assert!(formatted.lines().all(|line| line.len() <= 20));
    }
}
