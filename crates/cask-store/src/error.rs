use cask_canon::CanonError;
use cask_engine::EngineError;

/// Errors from store operations.
///
/// Read misses are not errors: `get` and friends return `Ok(None)` for
/// absence. This taxonomy covers the failures that abort an operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A value could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canon(#[from] CanonError),

    /// The addressable engine failed.
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),

    /// Persisted bytes could not be decoded.
    #[error("decode error at {address}: {reason}")]
    Decode { address: String, reason: String },

    /// The in-memory state lock was poisoned by a panicking writer.
    #[error("state lock poisoned: {0}")]
    Lock(String),

    /// A multi-step operation failed after some sub-writes already landed.
    ///
    /// Detected and reported, not rolled back: the write order of each
    /// operation is arranged so that the orphaned state is content-addressed
    /// and harmless (see the operation docs).
    #[error("partial write during {operation}: failed at the {stage} stage")]
    PartialWrite {
        operation: &'static str,
        stage: &'static str,
        #[source]
        source: EngineError,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
