//! Persisted key layout under the flat engine namespace.
//!
//! Content-addressed prefixes are keyed by a value's content digest;
//! route-addressed prefixes are keyed by a route digest. A content digest may
//! be referenced from many routes, but its bytes land once.

use cask_types::Digest;

/// Raw document bytes, content-addressed: `/entities/{content_id}`.
pub fn entity_key(id: &Digest) -> String {
    format!("/entities/{}", id.to_hex())
}

/// Ordered member-id list of a collection: `/collections/{route_digest}`.
pub fn collection_key(route: &Digest) -> String {
    format!("/collections/{}", route.to_hex())
}

/// Ordered push list of a stack: `/stacks/{route_digest}`.
pub fn stack_key(route: &Digest) -> String {
    format!("/stacks/{}", route.to_hex())
}

/// Raw pushed or mirrored payload bytes: `/blobs/{content_id}`.
pub fn blob_key(id: &Digest) -> String {
    format!("/blobs/{}", id.to_hex())
}

/// Mirrored value, content-addressed: `/states/{content_id}`.
pub fn state_key(id: &Digest) -> String {
    format!("/states/{}", id.to_hex())
}

/// Value-kind tag of a mirrored value: `/types/{content_id}`.
pub fn type_key(id: &Digest) -> String {
    format!("/types/{}", id.to_hex())
}

/// Latest content id seen for a mirrored route: `/tips/{route_digest}`.
pub fn tip_key(route: &Digest) -> String {
    format!("/tips/{}", route.to_hex())
}

/// Escaped source key for a mirrored route: `/names/{route_digest}`.
pub fn name_key(route: &Digest) -> String {
    format!("/names/{}", route.to_hex())
}

/// Source-scoped mirror of a raw value: `/{label}{escaped_pointer}`.
pub fn source_key(label: &str, escaped_pointer: &str) -> String {
    format!("/{label}{escaped_pointer}")
}
