//! Content-addressed state storage for CASK.
//!
//! This crate implements the store: logical documents addressed by
//! hierarchical path, where every value and every aggregate snapshot also
//! receives a deterministic identity derived from its canonical bytes. On
//! top of an [`AddressableEngine`](cask_engine::AddressableEngine) it
//! provides:
//!
//! - [`Store::get`] / [`Store::set`] / [`Store::patch`] / [`Store::delete`]
//!   — path-addressed document operations over a dual index (path-indexed
//!   tree plus hash-indexed object table);
//! - [`Store::post`] — append into a [`Collection`], an ordered sequence of
//!   content identities with lazy rehydration;
//! - [`Store::push`] — append onto a [`Stack`], a LIFO ledger whose payloads
//!   are never overwritten;
//! - [`Store::commit`] — snapshot the aggregate state as a content-addressed
//!   [`Entity`] and notify subscribers;
//! - [`Store::trust`] — mirror a foreign source's mutation stream into this
//!   store's content-addressed vocabulary.
//!
//! # Design Rules
//!
//! 1. A logical path maps to exactly one route digest; a content digest may
//!    be referenced from many routes, but its bytes land once.
//! 2. Read misses are absence (`Ok(None)`), never errors.
//! 3. Deletion tombstones: the value is nulled, the route's index records
//!    persist for auditability.
//! 4. Ledger entries are append-only: nothing a push ever wrote is removed
//!    by later pushes.
//! 5. One logical writer per store; notifications fire in mutation order.

pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod layout;
pub mod route;
pub mod stack;
pub mod store;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use collection::Collection;
pub use config::StoreConfig;
pub use entity::{Actor, Entity};
pub use error::{StoreError, StoreResult};
pub use events::{MemorySource, MirrorRecord, Mutation, MutationSource, StoreEvent};
pub use route::RouteInfo;
pub use stack::Stack;
pub use store::{CommitSnapshot, Store};
pub use value::{DataInfo, StateValue};
