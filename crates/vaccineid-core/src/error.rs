//! Validation error types

use thiserror::Error;

/// Result type alias for request validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A named request validation failure
///
/// The `Display` output is the message returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Patient id is not a canonical UUID
    #[error("Bad Request - Invalid ID")]
    InvalidId,

    /// Patient id query parameter was not supplied
    #[error("Bad Request - Missing id")]
    MissingId,

    /// Date is not `YYYY-MM-DD`
    #[error("Bad Request - Invalid Date")]
    InvalidDate,

    /// A required body field is absent
    #[error("Bad Request - Missing Required Parameter - {0}")]
    MissingField(String),

    /// A body field is present but not a string
    #[error("Bad Request - Malformed/Missing Parameters")]
    Malformed { field: String },
}
