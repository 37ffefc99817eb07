//! Foundation types for CASK (Content-Addressed State Kit).
//!
//! This crate provides the identity and classification types used throughout
//! the CASK system. Every other CASK crate depends on `cask-types`.
//!
//! # Key Types
//!
//! - [`Digest`] — Content-addressed identifier (BLAKE3 hash)
//! - [`ValueKind`] — Closed classification of storable value shapes
//! - [`StoreStatus`] — Lifecycle state of a store instance

pub mod digest;
pub mod error;
pub mod kind;
pub mod status;

pub use digest::Digest;
pub use error::TypeError;
pub use kind::ValueKind;
pub use status::StoreStatus;
