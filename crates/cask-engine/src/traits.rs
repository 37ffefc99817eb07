use async_trait::async_trait;

use crate::error::EngineResult;

/// One operation in an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Write `value` at `key`.
    Put { key: String, value: Vec<u8> },
    /// Remove `key`.
    Delete { key: String },
}

/// Ordered key-value storage contract.
///
/// All implementations must satisfy these invariants:
/// - A read of a missing key returns `Ok(None)`, never an error. Callers
///   branch on absence; only I/O failures are errors.
/// - `open` is idempotent; operations on an unopened engine fail with
///   [`crate::EngineError::Closed`].
/// - `close` is safe to call even if the engine was never opened.
/// - `iterate` yields entries in ascending key order.
/// - `batch` applies all operations or none.
/// - The engine never interprets stored bytes.
#[async_trait]
pub trait AddressableEngine: Send + Sync {
    /// Open the engine, making it ready to serve requests. Idempotent.
    async fn open(&self) -> EngineResult<()>;

    /// Read the bytes stored at `key`. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> EngineResult<Option<Vec<u8>>>;

    /// Write `value` at `key`, replacing any previous bytes.
    async fn put(&self, key: &str, value: Vec<u8>) -> EngineResult<()>;

    /// Remove `key`. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> EngineResult<bool>;

    /// Apply a batch of operations atomically.
    async fn batch(&self, ops: &[BatchOp]) -> EngineResult<()>;

    /// Scan all entries in ascending key order.
    async fn iterate(&self) -> EngineResult<Vec<(String, Vec<u8>)>>;

    /// Scan entries whose key starts with `prefix`, in ascending key order.
    ///
    /// Default implementation filters a full scan; ordered backends should
    /// override with a range scan.
    async fn iterate_prefix(&self, prefix: &str) -> EngineResult<Vec<(String, Vec<u8>)>> {
        let all = self.iterate().await?;
        Ok(all.into_iter().filter(|(k, _)| k.starts_with(prefix)).collect())
    }

    /// Close the engine, releasing its resources.
    async fn close(&self) -> EngineResult<()>;
}
