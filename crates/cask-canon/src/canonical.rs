//! Deterministic, key-order-independent serialization.
//!
//! Canonical form is compact JSON with every record's keys emitted in
//! ascending byte order, applied recursively. The ordering is enforced here
//! rather than inherited from the map representation, so determinism does not
//! depend on how a value was constructed or which serde_json features are
//! enabled.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CanonError, CanonResult};

/// Canonical bytes of any serializable value.
///
/// The value is first projected into a structured [`Value`]; projection
/// failure (an unresolvable or non-JSON-representable member) surfaces as
/// [`CanonError::Serialization`]. Structurally equal inputs yield
/// byte-identical output regardless of original key insertion order.
pub fn canonical_bytes<T: Serialize>(value: &T) -> CanonResult<Vec<u8>> {
    let projected =
        serde_json::to_value(value).map_err(|e| CanonError::Serialization(e.to_string()))?;
    canonical_value_bytes(&projected)
}

/// Canonical bytes of an already-structured value.
pub fn canonical_value_bytes(value: &Value) -> CanonResult<Vec<u8>> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> CanonResult<()> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_escaped(s, out)?,
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Sort keys explicitly; recursion handles nested records.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_escaped(key, out)?;
                out.push(b':');
                // Key came from the map, so the entry exists.
                if let Some(v) = map.get(key) {
                    write_canonical(v, out)?;
                }
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_escaped(s: &str, out: &mut Vec<u8>) -> CanonResult<()> {
    let quoted =
        serde_json::to_string(s).map_err(|e| CanonError::Serialization(e.to_string()))?;
    out.extend_from_slice(quoted.as_bytes());
    Ok(())
}
