//! Error types for Hollowmere.

use thiserror::Error;

/// Top-level error type for Hollowmere operations.
#[derive(Debug, Error)]
pub enum HollowError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Static content or save payload failed validation
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Hollowmere operations.
pub type HollowResult<T> = Result<T, HollowError>;
