//! Path-to-address routing.
//!
//! Every logical path resolves to exactly one route digest: the hash of its
//! escaped JSON Pointer form. The digest is the stable flat-namespace key for
//! route-scoped records (metadata, indices, collections, stacks, tips) and is
//! independent of whatever value is currently stored at the path.

use cask_canon::DigestHasher;
use cask_types::Digest;
use serde_json::{Map, Value};

/// Resolved addressing facts for one logical path. Pure data, no I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    /// The normalized logical path (always begins with `/`).
    pub path: String,
    /// JSON Pointer form with reserved characters escaped per segment.
    pub escaped_pointer: String,
    /// Hash of the escaped pointer, domain-separated from content hashes.
    pub route_digest: Digest,
}

impl RouteInfo {
    /// Resolve a logical path into its route facts.
    ///
    /// Normalization prepends a leading separator if missing and drops empty
    /// segments; escaping maps `~` to `~0` and `/` to `~1` within each
    /// segment. The root path resolves to the empty pointer.
    pub fn resolve(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let normalized = if segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", segments.join("/"))
        };
        let escaped_pointer = segments
            .iter()
            .map(|s| format!("/{}", escape_segment(s)))
            .collect::<String>();
        let route_digest = DigestHasher::ROUTE.hash(escaped_pointer.as_bytes());
        Self {
            path: normalized,
            escaped_pointer,
            route_digest,
        }
    }
}

/// Escape JSON Pointer reserved characters within one segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Read the value at an escaped pointer within a logical tree.
pub fn pointer_get<'a>(tree: &'a Value, escaped_pointer: &str) -> Option<&'a Value> {
    tree.pointer(escaped_pointer)
}

/// Write `value` at an escaped pointer, creating intermediate records.
///
/// A non-record intermediate is replaced wholesale by a record; the write
/// always lands. An empty pointer replaces the whole tree.
pub fn pointer_set(tree: &mut Value, escaped_pointer: &str, value: Value) {
    if escaped_pointer.is_empty() {
        *tree = value;
        return;
    }
    let segments: Vec<String> = escaped_pointer
        .split('/')
        .skip(1)
        .map(unescape_segment)
        .collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = tree;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(last.clone(), value);
    }
}
