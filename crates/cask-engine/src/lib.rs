//! The addressable engine contract for CASK.
//!
//! The store persists durable bytes through an external ordered key-value
//! engine. This crate defines that contract — [`AddressableEngine`] — and an
//! in-memory reference backend, [`MemoryEngine`], suitable for tests and
//! embedding.
//!
//! # Contract Rules
//!
//! 1. A missing key is absence (`Ok(None)`), never a fatal error.
//! 2. `open` is idempotent; `close` is safe even if `open` was never called.
//! 3. `iterate` yields entries in ascending key order.
//! 4. The engine never interprets stored bytes.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use traits::{AddressableEngine, BatchOp};
