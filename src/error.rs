pub use masterror::{AppError, AppResult};

/// Message carried by `error`, or its kind label when it has none
///
/// `AppError`'s `Display` prints the kind only; anything shown to a user, fed
/// to the model or classified for retry goes through here.
pub fn describe(error: &AppError) -> String {
    error.render_message().into_owned()
}

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create console write error
pub fn write_error(source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to write output: {}", source))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create LLM API error
pub fn llm_api_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AppError::service(msg)
}

/// Create startup connectivity error for the database or the model endpoint
///
/// The message keeps the word "connection" so retry classification in
/// [`crate::llm`] treats it as transient.
pub fn connectivity_error(target: &str, message: impl Into<String>) -> AppError {
    AppError::service(format!("{} connection error: {}", target, message.into()))
}

/// Create store error for failures outside query execution (catalog reads)
pub fn store_error(err: tokio_postgres::Error) -> AppError {
    let msg = match err.as_db_error() {
        Some(db) => format!("Database error {}: {}", db.code().code(), db.message()),
        None => format!("Database connection error: {}", err)
    };
    AppError::service(msg)
}

/// Create timeout error for an external call
pub fn timeout_error(what: &str, secs: u64) -> AppError {
    AppError::service(format!("{} timeout after {}s", what, secs))
}

/// Create error for a table the catalog does not know
pub fn unknown_table_error(table: &str) -> AppError {
    AppError::bad_request(format!("Table '{}' not found in knowledge base", table))
}
