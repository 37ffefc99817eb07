use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed classification of the value shapes the store accepts.
///
/// Replaces open-ended runtime type inspection with a fixed set of variants.
/// Every storable value maps to exactly one kind; there is no fall-through
/// case. `Binary` is only produced by explicit byte-payload entry points,
/// never inferred from a sequence of numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// The null value.
    Null,
    /// A boolean.
    Boolean,
    /// A number (integer or float).
    Number,
    /// A text string.
    Text,
    /// A structured record (string-keyed map).
    Record,
    /// An ordered sequence of values.
    Sequence,
    /// Raw bytes.
    Binary,
}

impl ValueKind {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::Text,
            Value::Object(_) => Self::Record,
            Value::Array(_) => Self::Sequence,
        }
    }

    /// Stable lowercase tag, used as the persisted type marker.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Text => "text",
            Self::Record => "record",
            Self::Sequence => "sequence",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_every_json_shape() {
        assert_eq!(ValueKind::of(&Value::Null), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!(42)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!("hi")), ValueKind::Text);
        assert_eq!(ValueKind::of(&json!({"a": 1})), ValueKind::Record);
        assert_eq!(ValueKind::of(&json!([1, 2, 3])), ValueKind::Sequence);
    }

    #[test]
    fn byte_sequences_are_not_inferred_as_binary() {
        assert_eq!(ValueKind::of(&json!([0, 255, 7])), ValueKind::Sequence);
    }

    #[test]
    fn tag_display_matches() {
        for kind in [
            ValueKind::Null,
            ValueKind::Boolean,
            ValueKind::Number,
            ValueKind::Text,
            ValueKind::Record,
            ValueKind::Sequence,
            ValueKind::Binary,
        ] {
            assert_eq!(format!("{kind}"), kind.tag());
        }
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&ValueKind::Record).unwrap();
        let parsed: ValueKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ValueKind::Record);
    }
}
