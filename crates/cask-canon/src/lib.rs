//! Canonical serialization and content identity for CASK.
//!
//! Provides deterministic, key-order-independent serialization of structured
//! values and domain-separated BLAKE3 hashing over those bytes. Together they
//! form the dedup and equality primitive for the whole system: two logically
//! equal values always produce identical bytes and therefore identical
//! digests.
//!
//! All hashing wraps BLAKE3 — no custom cryptography.

pub mod canonical;
pub mod error;
pub mod hasher;

pub use canonical::{canonical_bytes, canonical_value_bytes};
pub use error::{CanonError, CanonResult};
pub use hasher::{content_id, DigestHasher};
