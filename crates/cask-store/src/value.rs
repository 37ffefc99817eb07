//! The immutable state value wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cask_canon::{canonical_value_bytes, CanonResult, DigestHasher};
use cask_types::{Digest, ValueKind};

/// An immutable wrapper around one arbitrary value.
///
/// Constructed on demand at each write, never mutated, and discarded after
/// use — its `id` and canonical `serialized` form are what persist. Two
/// `StateValue`s built from equal values have equal ids regardless of how
/// the values were assembled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateValue {
    /// Content identity: value-domain hash of the canonical bytes.
    pub id: Digest,
    /// Canonical serialized form.
    pub serialized: Vec<u8>,
    /// The wrapped value.
    pub value: Value,
}

impl StateValue {
    /// Wrap a value, computing its canonical form and content identity.
    pub fn new(value: Value) -> CanonResult<Self> {
        let serialized = canonical_value_bytes(&value)?;
        let id = DigestHasher::VALUE.hash(&serialized);
        Ok(Self {
            id,
            serialized,
            value,
        })
    }

    /// The classified shape of the wrapped value.
    pub fn kind(&self) -> ValueKind {
        ValueKind::of(&self.value)
    }
}

/// Route metadata descriptor recorded at each write.
///
/// The `kind` field is the decode extension point: `get` consults it to pick
/// a decode strategy (currently a pass-through projection for every kind).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    /// Classified shape of the stored value.
    pub kind: ValueKind,
    /// Size of the canonical serialized form, in bytes.
    pub size: u64,
    /// Content identity of the stored value.
    pub hash: Digest,
}

impl DataInfo {
    /// Describe a state value.
    pub fn describe(state: &StateValue) -> Self {
        Self {
            kind: state.kind(),
            size: state.serialized.len() as u64,
            hash: state.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_values_have_equal_ids() {
        let a = StateValue::new(serde_json::from_str(r#"{"x":1,"y":2}"#).unwrap()).unwrap();
        let b = StateValue::new(serde_json::from_str(r#"{"y":2,"x":1}"#).unwrap()).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.serialized, b.serialized);
    }

    #[test]
    fn different_values_have_different_ids() {
        let a = StateValue::new(json!({"x": 1})).unwrap();
        let b = StateValue::new(json!({"x": 2})).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kind_classifies_the_wrapped_value() {
        assert_eq!(StateValue::new(json!("s")).unwrap().kind(), ValueKind::Text);
        assert_eq!(
            StateValue::new(json!({"a": 1})).unwrap().kind(),
            ValueKind::Record
        );
    }

    #[test]
    fn describe_reports_size_and_hash() {
        let state = StateValue::new(json!({"a": 1})).unwrap();
        let info = DataInfo::describe(&state);
        assert_eq!(info.kind, ValueKind::Record);
        assert_eq!(info.size, state.serialized.len() as u64);
        assert_eq!(info.hash, state.id);
    }

    #[test]
    fn data_info_serde_roundtrip() {
        let state = StateValue::new(json!([1, 2])).unwrap();
        let info = DataInfo::describe(&state);
        let bytes = serde_json::to_vec(&info).unwrap();
        let decoded: DataInfo = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(info, decoded);
    }
}
