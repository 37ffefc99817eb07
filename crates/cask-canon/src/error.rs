use thiserror::Error;

/// Errors from canonicalization and hashing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonError {
    /// The value cannot be serialized (e.g. a map with non-string keys).
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for canonicalization operations.
pub type CanonResult<T> = Result<T, CanonError>;
