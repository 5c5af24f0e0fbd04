//! Relational knowledge base access.
//!
//! The pipeline reads the store through [`KnowledgeStore`]; the production
//! implementation is [`PostgresStore`]. Query execution returns a
//! [`QueryFailure`] instead of an [`AppError`](crate::error::AppError) because
//! a failed query is still context for the answer, not a reason to stop.

mod postgres;
mod rows;

use std::fmt;

pub use postgres::{PostgresStore, connect_with_retry};
pub use rows::{CellValue, MAX_CELL_CHARS, RowSet};

use crate::{error::AppResult, schema::TableSchema};

/// Read-only view of the knowledge base.
#[allow(async_fn_in_trait)]
pub trait KnowledgeStore {
    /// Usable table names, ordered
    async fn list_tables(&self) -> AppResult<Vec<String>>;

    /// Columns and a few sample rows of one table
    async fn describe_table(&self, table: &str) -> AppResult<TableSchema>;

    /// Execute a single read-only statement
    async fn run(&self, sql: &str) -> Result<RowSet, QueryFailure>;
}

/// Categorized error types for SQL query failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE 42601 and friends)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, read-only violation)
    Execution,
    /// Transaction state errors
    Transaction,
    /// Connection/communication errors
    Connection,
    /// Statement did not finish in time
    Timeout,
    /// Unknown or unclassified errors
    Unknown
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Timeout => write!(f, "Timeout"),
            ErrorCategory::Unknown => write!(f, "Error")
        }
    }
}

/// Why a query produced no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFailure {
    pub category: ErrorCategory,
    /// SQLSTATE, present only when the server rejected the statement
    pub code:     Option<String>,
    pub message:  String,
    pub detail:   Option<String>,
    pub hint:     Option<String>
}

impl QueryFailure {
    /// Build from a driver error, keeping server-side detail when present
    pub fn from_pg_error(err: &tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => {
                let code = db.code().code().to_string();
                Self {
                    category: categorize_sqlstate(&code),
                    code:     Some(code),
                    message:  db.message().to_string(),
                    detail:   db.detail().map(str::to_string),
                    hint:     db.hint().map(str::to_string)
                }
            }
            None => {
                let category = if err.is_closed() {
                    ErrorCategory::Connection
                } else {
                    ErrorCategory::Unknown
                };
                Self::other(category, err.to_string())
            }
        }
    }

    /// Failure that did not come from the server's error response
    pub fn other(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            code: None,
            message: message.into(),
            detail: None,
            hint: None
        }
    }

    /// The database itself rejected the statement
    pub fn is_database(&self) -> bool {
        self.code.is_some()
    }

    /// Multi-line rendering with category, SQLSTATE, detail and hint
    pub fn display_full(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.category, self.message)];
        if let Some(code) = &self.code {
            lines.push(format!("  SQLSTATE: {}", code));
        }
        if let Some(detail) = &self.detail {
            lines.push(format!("  Detail: {}", detail));
        }
        if let Some(hint) = &self.hint {
            lines.push(format!("  Hint: {}", hint));
        }
        lines.join("\n")
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Categorize a SQLSTATE code into an ErrorCategory.
pub fn categorize_sqlstate(code: &str) -> ErrorCategory {
    if code.len() < 2 {
        return ErrorCategory::Unknown;
    }
    match &code[..2] {
        "42" => {
            if code == "42601" || code == "42000" {
                ErrorCategory::Syntax
            } else {
                ErrorCategory::Semantic
            }
        }
        "57" if code == "57014" => ErrorCategory::Timeout,
        "22" | "23" | "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        "25" | "40" => ErrorCategory::Transaction,
        "08" => ErrorCategory::Connection,
        _ => ErrorCategory::Unknown
    }
}
