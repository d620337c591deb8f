//! Error types for the store layer

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store access token could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("Document store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored document does not have the expected shape
    #[error("Invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },

    /// Store settings are missing or unusable
    #[error("Invalid store configuration: {0}")]
    Config(String),
}
