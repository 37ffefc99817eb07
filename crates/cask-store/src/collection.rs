//! Ordered, appendable sequences of content identities.

use serde_json::Value;
use tracing::warn;

use cask_engine::AddressableEngine;
use cask_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::layout::entity_key;
use crate::value::StateValue;

/// An append-ordered sequence of content identities with lazy rehydration.
///
/// The member id list *is* the collection's version history — order is
/// append order and is significant. Serialization covers the id list only;
/// member payloads live content-addressed at `/entities/{id}` and are
/// rehydrated on demand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    member_ids: Vec<Digest>,
    members: Option<Vec<Option<Value>>>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a collection from a persisted id list.
    pub fn from_member_ids(member_ids: Vec<Digest>) -> Self {
        Self {
            member_ids,
            members: None,
        }
    }

    /// Decode a persisted id list.
    pub fn from_bytes(address: &str, bytes: &[u8]) -> StoreResult<Self> {
        let member_ids: Vec<Digest> =
            bincode::deserialize(bytes).map_err(|e| StoreError::Decode {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_member_ids(member_ids))
    }

    /// Serialize the ordered id list (not the payloads).
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(&self.member_ids).map_err(|e| StoreError::Decode {
            address: "<collection>".into(),
            reason: e.to_string(),
        })
    }

    /// Current height (number of members ever appended).
    pub fn height(&self) -> usize {
        self.member_ids.len()
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    /// The ordered member identities.
    pub fn member_ids(&self) -> &[Digest] {
        &self.member_ids
    }

    /// Append a state value; returns the new height.
    pub fn push(&mut self, state: &StateValue) -> usize {
        self.member_ids.push(state.id);
        if let Some(members) = self.members.as_mut() {
            members.push(Some(state.value.clone()));
        }
        self.member_ids.len()
    }

    /// Resolve each member id against `/entities/{id}` through the engine.
    ///
    /// The result is positional, aligned with the id list. A missing or
    /// undecodable entity yields a `None` slot rather than aborting the
    /// rehydration.
    pub async fn populate(
        &mut self,
        engine: &dyn AddressableEngine,
    ) -> StoreResult<&[Option<Value>]> {
        let mut members = Vec::with_capacity(self.member_ids.len());
        for id in &self.member_ids {
            let address = entity_key(id);
            let slot = match engine.get(&address).await? {
                Some(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(%address, error = %e, "undecodable collection member");
                        None
                    }
                },
                None => None,
            };
            members.push(slot);
        }
        self.members = Some(members);
        Ok(self.members.as_deref().unwrap_or(&[]))
    }

    /// Rehydrated members, if [`populate`](Self::populate) has run.
    pub fn members(&self) -> Option<&[Option<Value>]> {
        self.members.as_deref()
    }
}
