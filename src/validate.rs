//! Sanitizer for model-generated SQL.
//!
//! Model output is untrusted text. [`SqlValidator::validate`] turns any input
//! into a [`ValidatedSql`] that starts with `SELECT`, contains none of the
//! [`DENYLIST`] keywords and carries a `LIMIT`. Whatever cannot be cleaned is
//! replaced by the fallback query.
//!
//! The denylist scan is a plain substring check over the whole cleaned text.
//! It does not parse: a keyword inside a string literal or an identifier such
//! as `updated_at` also triggers the fallback.
//!
//! The `LIMIT` check is textual too. A trailing `-- comment` swallows the
//! appended clause, and a `LIMIT` anywhere in the text (even in a literal)
//! counts as present. The read-only transaction and `statement_timeout` in
//! [`crate::store`] are what actually bound execution.
//!
//! # Example
//!
//! ```
//! use compliance_rag::validate::SqlValidator;
//!
//! let validator = SqlValidator::new(Some("incidents"));
//!
//! let sql = validator.validate("```sql\nSELECT * FROM incidents\n```");
//! assert_eq!(sql.as_str(), "SELECT * FROM incidents LIMIT 20");
//!
//! let sql = validator.validate("DELETE FROM incidents");
//! assert_eq!(sql.as_str(), "SELECT * FROM incidents LIMIT 5");
//! ```

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Keywords that must never reach the database
pub const DENYLIST: [&str; 6] = ["DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE"];

/// Limit appended to statements that have none
pub const DEFAULT_LIMIT: u32 = 20;

/// Limit of the fallback query
pub const FALLBACK_LIMIT: u32 = 5;

/// First `SELECT` through end of text, one trailing semicolon excluded.
static SELECT_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(SELECT.*?);?$").expect("valid regex"));

/// A statement that passed validation.
///
/// Only [`SqlValidator`] constructs this type, so holding one means the text
/// begins with `SELECT`, has no denylisted keyword and has a `LIMIT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedSql {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Why a candidate was replaced by the fallback query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Contains a denylisted keyword
    Denylisted(&'static str),
    /// Does not start with `SELECT`
    NotSelect
}

/// Deterministic sanitizer over candidate SQL.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    fallback_table: Option<String>,
    default_limit:  u32,
    fallback_limit: u32
}

impl SqlValidator {
    /// Validator whose fallback reads from `fallback_table` (the first listed table)
    pub fn new(fallback_table: Option<&str>) -> Self {
        Self::with_limits(fallback_table, DEFAULT_LIMIT, FALLBACK_LIMIT)
    }

    pub fn with_limits(
        fallback_table: Option<&str>,
        default_limit: u32,
        fallback_limit: u32
    ) -> Self {
        Self {
            fallback_table: fallback_table.map(str::to_string),
            default_limit,
            fallback_limit
        }
    }

    /// The fixed safe statement substituted for rejected candidates
    pub fn fallback(&self) -> ValidatedSql {
        match &self.fallback_table {
            Some(table) => ValidatedSql(format!(
                "SELECT * FROM {} LIMIT {}",
                table, self.fallback_limit
            )),
            None => ValidatedSql(String::from("SELECT 1 LIMIT 1"))
        }
    }

    /// Clean, check and bound a candidate statement
    pub fn validate(&self, candidate: &str) -> ValidatedSql {
        let cleaned = strip_fences(candidate);
        let working = extract_select(&cleaned);

        if let Some(rejection) = check(&cleaned, working) {
            warn!(?rejection, candidate = %cleaned, "generated SQL rejected, using fallback");
            return self.fallback();
        }

        if working.to_uppercase().contains("LIMIT") {
            ValidatedSql(working.to_string())
        } else {
            ValidatedSql(format!("{} LIMIT {}", working, self.default_limit))
        }
    }
}

/// Trim and drop markdown code-fence markers
pub fn strip_fences(candidate: &str) -> String {
    candidate
        .trim()
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// First `SELECT` to end of text, minus one trailing semicolon
pub fn extract_select(cleaned: &str) -> &str {
    SELECT_TAIL
        .captures(cleaned)
        .and_then(|caps| caps.get(1))
        .map_or(cleaned, |m| m.as_str())
}

fn check(cleaned: &str, working: &str) -> Option<Rejection> {
    let upper = cleaned.to_uppercase();
    if let Some(keyword) = DENYLIST.iter().copied().find(|k| upper.contains(k)) {
        return Some(Rejection::Denylisted(keyword));
    }
    if !working.to_uppercase().starts_with("SELECT") {
        return Some(Rejection::NotSelect);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_select_drops_trailing_semicolon() {
        assert_eq!(extract_select("SELECT 1;"), "SELECT 1");
    }

    #[test]
    fn test_extract_select_skips_preamble() {
        let text = "Here you go:\nselect id\nfrom filings";
        assert_eq!(extract_select(text), "select id\nfrom filings");
    }

    #[test]
    fn test_extract_select_without_match_keeps_text() {
        assert_eq!(extract_select("SHOW TABLES"), "SHOW TABLES");
    }

    #[test]
    fn test_check_reports_keyword() {
        assert_eq!(
            check("select * from t where x = 'drop'", "select * from t where x = 'drop'"),
            Some(Rejection::Denylisted("DROP"))
        );
        assert_eq!(
            check("WITH x AS (SELECT 1)", "WITH x AS (SELECT 1)"),
            Some(Rejection::NotSelect)
        );
    }

    #[test]
    fn test_fallback_without_tables() {
        let validator = SqlValidator::new(None);
        assert_eq!(validator.validate("TRUNCATE x").as_str(), "SELECT 1 LIMIT 1");
    }
}
