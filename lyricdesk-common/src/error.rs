//! Common error types for LyricDesk

use thiserror::Error;

/// Common result type for LyricDesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across LyricDesk services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The hosted backend rejected a call; carries its message verbatim
    #[error("{0}")]
    Backend(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Message suitable for per-record error reporting.
    ///
    /// Backend and database rejections are reported without the category
    /// prefix so import outcomes read like the store's own message.
    pub fn record_message(&self) -> String {
        match self {
            Error::Backend(msg) => msg.clone(),
            Error::Database(sqlx::Error::Database(db_err)) => db_err.message().to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = Error::Backend("duplicate key value violates unique constraint".to_string());
        assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
        assert_eq!(err.record_message(), err.to_string());
    }

    #[test]
    fn test_invalid_input_prefix() {
        let err = Error::InvalidInput("Unknown column: foo".to_string());
        assert_eq!(err.to_string(), "Invalid input: Unknown column: foo");
    }
}
