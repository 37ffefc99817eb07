use thiserror::Error;

/// Errors from addressable engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine is closed and cannot serve requests.
    #[error("engine is closed")]
    Closed,

    /// I/O failure in the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal backend failure (lock poisoning, corruption).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
