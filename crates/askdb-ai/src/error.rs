//! Error types for text-to-SQL operations

use askdb_core::AskdbError;
use thiserror::Error;

/// Error type for chat, training and generation operations
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid training data: {0}")]
    InvalidTraining(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Database(#[from] AskdbError),
}

/// Result type for text-to-SQL operations
pub type AiResult<T> = Result<T, AiError>;
