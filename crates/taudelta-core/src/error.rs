//! Error types shared by the tau/delta gateway crates.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating payloads or encoding points.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was absent or `null`.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field was present but its value is unusable.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// The name of the invalid field.
        field: &'static str,
        /// Description of what's wrong.
        reason: String,
    },

    /// A point was encoded without any field (the store requires at least one).
    #[error("point '{0}' has no fields")]
    EmptyPoint(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
