//! Error types for askdb

use thiserror::Error;

/// Core error type for askdb operations
#[derive(Error, Debug)]
pub enum AskdbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AskdbError {
    /// Whether this error came from executing SQL rather than from
    /// connecting or reflecting the schema.
    pub fn is_query(&self) -> bool {
        matches!(self, AskdbError::Query(_))
    }
}

/// Result type alias for askdb operations
pub type Result<T> = std::result::Result<T, AskdbError>;
