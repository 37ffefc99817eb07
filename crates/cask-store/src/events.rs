//! Store notifications and the foreign mutation-source contract.
//!
//! The store replaces ambient event emission with an explicit subscription
//! interface: callers obtain a broadcast receiver and consume notifications
//! at their own pace. Delivery is in mutation order, at most once per
//! mutation; a lagging or dropped subscriber never blocks the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use cask_types::Digest;

/// One observed mutation from a foreign key-value source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    /// The source's own key.
    pub key: String,
    /// The written value.
    pub value: Value,
}

/// A foreign event-emitting key-value source the store can mirror.
///
/// The source knows nothing about content addressing; it only announces
/// `(key, value)` mutations. `trust` consumes the stream and re-expresses
/// each mutation in the store's content-addressed vocabulary.
pub trait MutationSource {
    /// Obtain a receiver for this source's mutation notifications.
    fn subscribe(&self) -> broadcast::Receiver<Mutation>;
}

/// The normalized mirrored-mutation record re-emitted after a trust write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Record type tag; always `"Request"`.
    pub kind: String,
    /// Mutation method; always `"put"` for mirrored writes.
    pub method: String,
    /// Label of the trusted source.
    pub actor: String,
    /// Content identity of the mirrored value.
    pub object: Digest,
    /// The source's key.
    pub target: String,
    /// The mirrored value.
    pub data: Value,
}

/// Notifications emitted by a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A commit snapshot was produced.
    Commit {
        /// Identity of the snapshot entity.
        id: Digest,
        /// The snapshot payload.
        data: Value,
    },
    /// A foreign mutation was mirrored into the store.
    Mirror(MirrorRecord),
}

/// Fan-out channel for store events.
///
/// A single broadcast channel preserves emission order for every subscriber.
/// Publishing with no subscribers is a no-op.
pub(crate) struct EventRouter {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventRouter {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: StoreEvent) {
        // No receivers is not an error; events are advisory.
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A minimal in-process [`MutationSource`] backed by a broadcast channel.
///
/// Useful for tests and for bridging any in-process producer into `trust`.
pub struct MemorySource {
    sender: broadcast::Sender<Mutation>,
}

impl MemorySource {
    /// Create a source with the given notification buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Announce a `(key, value)` mutation to all subscribers.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let _ = self.sender.send(Mutation {
            key: key.into(),
            value,
        });
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(256)
    }
}

impl MutationSource for MemorySource {
    fn subscribe(&self) -> broadcast::Receiver<Mutation> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn router_delivers_in_order() {
        let router = EventRouter::new(16);
        let mut rx = router.subscribe();

        router.publish(StoreEvent::Commit {
            id: Digest::from_bytes(b"1"),
            data: json!(1),
        });
        router.publish(StoreEvent::Commit {
            id: Digest::from_bytes(b"2"),
            data: json!(2),
        });

        match rx.try_recv().unwrap() {
            StoreEvent::Commit { data, .. } => assert_eq!(data, json!(1)),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            StoreEvent::Commit { data, .. } => assert_eq!(data, json!(2)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let router = EventRouter::new(4);
        router.publish(StoreEvent::Commit {
            id: Digest::from_bytes(b"unheard"),
            data: json!(null),
        });
        assert_eq!(router.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn memory_source_broadcasts_mutations() {
        let source = MemorySource::default();
        let mut rx = source.subscribe();

        source.put("k", json!("v"));
        let mutation = rx.recv().await.unwrap();
        assert_eq!(mutation.key, "k");
        assert_eq!(mutation.value, json!("v"));
    }
}
