use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// 32-byte BLAKE3 identity used for both halves of the dual address space.
///
/// A `Digest` names either content (the hash of a value's canonical bytes)
/// or a route (the hash of a path's escaped pointer form); domain tags keep
/// the two spaces disjoint even for identical input bytes. Because identity
/// is derived from bytes alone, many routes may reference one content
/// digest while the bytes land on the engine once.
///
/// The full hex form is the engine address component; `short_hex` is the
/// log-friendly prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Hash raw bytes directly (no domain tag).
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap an already-computed 32-byte hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Full hex form, as embedded in engine keys and tip records.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Eight-character hex prefix for diagnostics.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the full hex form back into a digest.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
