//! LIFO ledgers of content identities.

use cask_types::Digest;

use crate::error::{StoreError, StoreResult};

/// An append-only ledger of content identities with LIFO access.
///
/// The order list records push order (last pushed = top) and is persisted
/// separately from the raw payloads, which live at `/blobs/{id}`. Pushing
/// never removes prior blobs, and popping truncates the logical order only —
/// every id ever pushed stays retrievable via its blob address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    order: Vec<Digest>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a persisted order list.
    pub fn from_bytes(address: &str, bytes: &[u8]) -> StoreResult<Self> {
        let order: Vec<Digest> = bincode::deserialize(bytes).map_err(|e| StoreError::Decode {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { order })
    }

    /// Serialize the order list.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(&self.order).map_err(|e| StoreError::Decode {
            address: "<stack>".into(),
            reason: e.to_string(),
        })
    }

    /// Append an id; returns the new depth.
    pub fn push(&mut self, id: Digest) -> usize {
        self.order.push(id);
        self.order.len()
    }

    /// The id on top of the stack, if any.
    pub fn top(&self) -> Option<&Digest> {
        self.order.last()
    }

    /// Remove and return the top id. The corresponding blob is untouched.
    pub fn pop(&mut self) -> Option<Digest> {
        self.order.pop()
    }

    /// Push order, oldest first.
    pub fn order(&self) -> &[Digest] {
        &self.order
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the stack has no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> Digest {
        Digest::from_bytes(&[n])
    }

    #[test]
    fn push_reports_depth_and_top() {
        let mut stack = Stack::new();
        assert_eq!(stack.push(id(1)), 1);
        assert_eq!(stack.push(id(2)), 2);
        assert_eq!(stack.top(), Some(&id(2)));
    }

    #[test]
    fn pop_is_lifo() {
        let mut stack = Stack::new();
        stack.push(id(1));
        stack.push(id(2));
        assert_eq!(stack.pop(), Some(id(2)));
        assert_eq!(stack.pop(), Some(id(1)));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn order_never_shrinks_on_push() {
        let mut stack = Stack::new();
        stack.push(id(1));
        let before = stack.order().to_vec();
        stack.push(id(2));
        assert_eq!(&stack.order()[..1], before.as_slice());
    }

    #[test]
    fn bytes_roundtrip() {
        let mut stack = Stack::new();
        stack.push(id(7));
        stack.push(id(8));

        let bytes = stack.to_bytes().unwrap();
        let decoded = Stack::from_bytes("/stacks/test", &bytes).unwrap();
        assert_eq!(decoded, stack);
    }

    #[test]
    fn decode_failure_is_reported() {
        let err = Stack::from_bytes("/stacks/bad", &[0xff; 5]).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
