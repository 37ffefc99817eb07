//! In-memory ordered engine for testing and ephemeral stores.
//!
//! [`MemoryEngine`] keeps all entries in a `BTreeMap` behind a `RwLock`, so
//! iteration is naturally key-ordered. Data is lost when the engine is
//! dropped.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::traits::{AddressableEngine, BatchOp};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Vec<u8>>,
    open: bool,
}

/// An in-memory implementation of [`AddressableEngine`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    inner: RwLock<Inner>,
}

impl MemoryEngine {
    /// Create a new engine. It must still be `open`ed before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or(0)
    }

    /// Returns `true` if the engine holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_inner(&self) -> EngineResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| EngineError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_inner(&self) -> EngineResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| EngineError::Backend(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl AddressableEngine for MemoryEngine {
    async fn open(&self) -> EngineResult<()> {
        let mut inner = self.write_inner()?;
        if !inner.open {
            inner.open = true;
            debug!("memory engine opened");
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> EngineResult<Option<Vec<u8>>> {
        let inner = self.read_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        Ok(inner.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> EngineResult<()> {
        let mut inner = self.write_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        inner.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> EngineResult<bool> {
        let mut inner = self.write_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        Ok(inner.entries.remove(key).is_some())
    }

    async fn batch(&self, ops: &[BatchOp]) -> EngineResult<()> {
        let mut inner = self.write_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        // Single lock hold makes the batch atomic with respect to readers.
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    inner.entries.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    inner.entries.remove(key);
                }
            }
        }
        Ok(())
    }

    async fn iterate(&self) -> EngineResult<Vec<(String, Vec<u8>)>> {
        let inner = self.read_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        Ok(inner
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn iterate_prefix(&self, prefix: &str) -> EngineResult<Vec<(String, Vec<u8>)>> {
        let inner = self.read_inner()?;
        if !inner.open {
            return Err(EngineError::Closed);
        }
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn close(&self) -> EngineResult<()> {
        let mut inner = self.write_inner()?;
        if inner.open {
            inner.open = false;
            debug!("memory engine closed");
        }
        Ok(())
    }
}
