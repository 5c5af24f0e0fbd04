//! Runs validated SQL and turns the outcome into answer context.
//!
//! Execution never fails from the caller's point of view: rows, an empty
//! result and every error all come back as text for the answer prompt.

use tracing::{debug, warn};

use crate::{
    store::{KnowledgeStore, QueryFailure},
    validate::ValidatedSql
};

/// Context used when the query matched nothing
pub const NO_RECORDS_MESSAGE: &str = "No matching records found in database.";

/// Whether rendered rows amount to no data
pub fn is_no_records(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == "[]"
}

/// Context text for a query failure
///
/// Server-side rejections read as database errors; anything else (lost
/// connection, timeout) is reported as a generic error.
pub fn failure_context(failure: &QueryFailure) -> String {
    if failure.is_database() {
        format!("Database query error: {}", failure.display_full())
    } else {
        format!("Error: {}", failure.message)
    }
}

/// Executes validated statements against a store.
pub struct QueryExecutor<'a, S> {
    store: &'a S
}

impl<'a, S: KnowledgeStore> QueryExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store
        }
    }

    /// Run `sql` and return rows, the no-records message or an error description
    pub async fn execute(&self, sql: &ValidatedSql) -> String {
        match self.store.run(sql.as_str()).await {
            Ok(rows) => {
                let text = rows.to_context_text();
                debug!(rows = rows.rows.len(), "query returned");
                if is_no_records(&text) {
                    NO_RECORDS_MESSAGE.to_string()
                } else {
                    text
                }
            }
            Err(failure) => {
                warn!(
                    category = %failure.category,
                    error = %failure,
                    %sql,
                    "query failed, continuing with error context"
                );
                failure_context(&failure)
            }
        }
    }
}
