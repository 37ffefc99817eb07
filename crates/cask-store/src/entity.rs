//! Typed content records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cask_canon::{CanonResult, DigestHasher};
use cask_types::{Digest, ValueKind};

use crate::error::{StoreError, StoreResult};
use crate::value::DataInfo;

/// A named, typed content record.
///
/// The snapshot object produced by a commit, and the envelope for any other
/// typed aggregate. Its identity is the digest of its own canonical bytes,
/// so entities with equal kind and data are the same entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Record type tag (e.g. `"document"`, `"commit"`).
    pub kind: String,
    /// The record payload.
    pub data: Value,
}

impl Entity {
    /// Create a new entity record.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Content identity in the entity domain.
    pub fn id(&self) -> CanonResult<Digest> {
        DigestHasher::ENTITY.hash_canonical(self)
    }

    /// Serialize for storage.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Decode {
            address: "<entity>".into(),
            reason: e.to_string(),
        })
    }

    /// Decode from stored bytes.
    pub fn from_bytes(address: &str, bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode {
            address: address.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Per-write identity record kept in the `actors` index.
///
/// Binds a route to the data-info descriptor of the value written there; its
/// id is derived from that binding, so rewriting the same value at the same
/// path yields the same actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identity of this actor record.
    pub id: Digest,
    /// The logical path the write addressed.
    pub path: String,
    /// Classified shape of the written value.
    pub kind: ValueKind,
    /// Canonical size of the written value.
    pub size: u64,
    /// Content identity of the written value.
    pub hash: Digest,
}

impl Actor {
    /// Build the actor record for a write of `info` at `path`.
    pub fn new(path: &str, info: &DataInfo) -> CanonResult<Self> {
        #[derive(Serialize)]
        struct Identity<'a> {
            path: &'a str,
            kind: ValueKind,
            size: u64,
            hash: Digest,
        }
        let id = DigestHasher::ENTITY.hash_canonical(&Identity {
            path,
            kind: info.kind,
            size: info.size,
            hash: info.hash,
        })?;
        Ok(Self {
            id,
            path: path.to_string(),
            kind: info.kind,
            size: info.size,
            hash: info.hash,
        })
    }
}
