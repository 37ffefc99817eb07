//! The store: path routing, the dual index, commits, and mirroring.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use cask_canon::DigestHasher;
use cask_engine::{AddressableEngine, BatchOp};
use cask_types::{Digest, StoreStatus, ValueKind};

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::entity::{Actor, Entity};
use crate::error::{StoreError, StoreResult};
use crate::events::{EventRouter, MirrorRecord, Mutation, MutationSource, StoreEvent};
use crate::layout::{
    blob_key, collection_key, entity_key, name_key, source_key, stack_key, state_key, tip_key,
    type_key,
};
use crate::route::{pointer_get, pointer_set, RouteInfo};
use crate::stack::Stack;
use crate::value::{DataInfo, StateValue};

/// A commit snapshot: the aggregate entity and its identity.
///
/// The identity is the commit-domain digest of the entity's canonical bytes,
/// so repeated commits over unchanged state produce equal ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSnapshot {
    /// Identity of the snapshot.
    pub id: Digest,
    /// The snapshot entity (`kind == "commit"`).
    pub entity: Entity,
}

/// In-memory state owned exclusively by one store instance.
struct StoreState {
    /// The logical content tree, navigated by escaped pointer.
    content: Value,
    /// Actor-identity records by actor id.
    actors: HashMap<Digest, Actor>,
    /// Content-addressed dedup table: content digest to value.
    documents: HashMap<Digest, Value>,
    /// Route metadata: route digest to data-info descriptor.
    metadata: HashMap<Digest, DataInfo>,
    /// Route digest to escaped pointer.
    indices: HashMap<Digest, String>,
    /// Key registry: route digest to original path, for reverse lookup.
    keys: HashMap<Digest, String>,
    /// Every engine address this store has written (erased on
    /// non-persistent shutdown).
    addresses: BTreeSet<String>,
    status: StoreStatus,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            content: Value::Object(Map::new()),
            actors: HashMap::new(),
            documents: HashMap::new(),
            metadata: HashMap::new(),
            indices: HashMap::new(),
            keys: HashMap::new(),
            addresses: BTreeSet::new(),
            status: StoreStatus::Paused,
        }
    }
}

/// Content-addressed store over an addressable engine.
///
/// Orchestrates path routing, the dual index (path-indexed tree plus
/// hash-indexed object table), collection and stack persistence, commit
/// snapshots, and trust-based mirroring. Instances are fully independent;
/// there is no shared ambient state.
///
/// One logical writer per store is assumed. The in-memory state sits behind
/// an `RwLock` so the mirror consumer task and callers do not race at the
/// memory level, but overlapping writers must still be serialized by the
/// caller — no cross-operation transactionality is provided.
pub struct Store {
    config: StoreConfig,
    engine: Arc<dyn AddressableEngine>,
    state: RwLock<StoreState>,
    router: EventRouter,
}

impl Store {
    /// Create a store over the given engine. The engine is opened lazily on
    /// first use (or eagerly via [`start`](Self::start)).
    pub fn new(config: StoreConfig, engine: Arc<dyn AddressableEngine>) -> Self {
        let router = EventRouter::new(config.event_capacity);
        Self {
            config,
            engine,
            state: RwLock::new(StoreState::default()),
            router,
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current lifecycle status.
    pub fn status(&self) -> StoreStatus {
        self.state
            .read()
            .map(|s| s.status)
            .unwrap_or(StoreStatus::Error)
    }

    /// Subscribe to commit and mirror notifications.
    ///
    /// Notifications fire in mutation order, at most once per mutation. A
    /// lagging subscriber misses events; it never blocks the store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.router.subscribe()
    }

    /// Number of live event subscribers.
    pub fn subscribers(&self) -> usize {
        self.router.subscriber_count()
    }

    /// Resolve the routing facts for a path without touching any state.
    pub fn route_info(&self, path: &str) -> RouteInfo {
        RouteInfo::resolve(path)
    }

    /// Reverse-lookup the original path registered for a route digest.
    pub fn lookup_route(&self, route_digest: &Digest) -> StoreResult<Option<String>> {
        Ok(self.read_state()?.keys.get(route_digest).cloned())
    }

    /// The data-info descriptor recorded for a path, if any.
    ///
    /// Survives `delete`: routes are tombstoned, not erased.
    pub fn metadata_for(&self, path: &str) -> StoreResult<Option<DataInfo>> {
        let route = RouteInfo::resolve(path);
        Ok(self.read_state()?.metadata.get(&route.route_digest).cloned())
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Open the engine and mark the store started.
    pub async fn start(&self) -> StoreResult<()> {
        self.ensure_engine().await
    }

    /// Shut the store down.
    ///
    /// With `persistent == false`, every address this store wrote is erased
    /// from the engine first. Safe to call even if the engine was never
    /// opened.
    pub async fn stop(&self) -> StoreResult<()> {
        self.set_status(StoreStatus::Stopping)?;
        if !self.config.persistent {
            let addresses: Vec<String> =
                self.read_state()?.addresses.iter().cloned().collect();
            if !addresses.is_empty() {
                let ops: Vec<BatchOp> = addresses
                    .into_iter()
                    .map(|key| BatchOp::Delete { key })
                    .collect();
                if let Err(e) = self.engine.batch(&ops).await {
                    self.set_status(StoreStatus::Error)?;
                    return Err(e.into());
                }
                self.write_state()?.addresses.clear();
            }
        }
        if let Err(e) = self.engine.close().await {
            self.set_status(StoreStatus::Error)?;
            return Err(e.into());
        }
        self.set_status(StoreStatus::Stopped)?;
        info!(path = %self.config.path, "store stopped");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Document operations
    // -------------------------------------------------------------------

    /// Read the value at a path from the logical tree.
    ///
    /// Absence — no metadata for the route, or a tombstoned value — is
    /// `Ok(None)`, never an error. The recorded metadata kind is the decode
    /// extension point; the current decode is a pass-through projection.
    pub fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let route = RouteInfo::resolve(path);
        let state = self.read_state()?;
        if !state.metadata.contains_key(&route.route_digest) {
            return Ok(None);
        }
        match pointer_get(&state.content, &route.escaped_pointer) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(Some(v.clone())),
        }
    }

    /// Write a value at a path.
    ///
    /// Records the actor identity, the content-addressed document, the route
    /// metadata and pointer index, mutates the logical tree, persists the
    /// canonical bytes at `/entities/{id}`, commits, and returns the value
    /// read back through [`get`](Self::get).
    pub async fn set(&self, path: &str, value: Value) -> StoreResult<Value> {
        let route = RouteInfo::resolve(path);
        let state_value = StateValue::new(value)?;
        let info = DataInfo::describe(&state_value);
        let actor = Actor::new(&route.path, &info)?;

        {
            let mut state = self.write_state()?;
            state.actors.insert(actor.id, actor);
            state
                .documents
                .insert(state_value.id, state_value.value.clone());
            state
                .indices
                .insert(route.route_digest, route.escaped_pointer.clone());
            state.metadata.insert(route.route_digest, info);
            state
                .keys
                .entry(route.route_digest)
                .or_insert_with(|| route.path.clone());
            pointer_set(
                &mut state.content,
                &route.escaped_pointer,
                state_value.value.clone(),
            );
        }

        self.persist(&entity_key(&state_value.id), state_value.serialized.clone())
            .await?;
        self.commit()?;
        debug!(path = %route.path, id = %state_value.id.short_hex(), "set");
        Ok(self.get(&route.path)?.unwrap_or(Value::Null))
    }

    /// Shallow-merge a partial value over the current value at a path.
    ///
    /// Top-level keys of `partial` override; nested structures are replaced
    /// wholesale, never deep-merged. A missing current value defaults to an
    /// empty record; a non-record on either side means `partial` wins.
    pub async fn patch(&self, path: &str, partial: Value) -> StoreResult<Value> {
        let current = self
            .get(path)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        let merged = shallow_merge(current, partial);
        self.set(path, merged).await
    }

    /// Tombstone the value at a path.
    ///
    /// Writes null into the logical tree and commits. The route's metadata,
    /// pointer index, and key registration persist, keeping the route's
    /// history auditable. A route that was never written is left untouched;
    /// no tombstone lands and no commit fires.
    pub fn delete(&self, path: &str) -> StoreResult<()> {
        let route = RouteInfo::resolve(path);
        {
            let mut state = self.write_state()?;
            if !state.metadata.contains_key(&route.route_digest) {
                return Ok(());
            }
            pointer_set(&mut state.content, &route.escaped_pointer, Value::Null);
        }
        self.commit()?;
        debug!(path = %route.path, "delete");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------

    /// Append a value into the collection addressed by the path's route.
    ///
    /// Returns the content identity of the appended value, not the
    /// collection's identity — callers dereference `/entities/{id}`
    /// independently of collection membership, and several collections may
    /// reference the same entity.
    ///
    /// The entity bytes land before the updated id list, so a failure window
    /// can orphan a content-addressed entity (harmless, dedup'd) but never
    /// publish a member id without its entity; a failure after the entity
    /// write surfaces as [`StoreError::PartialWrite`].
    pub async fn post(&self, path: &str, value: Value) -> StoreResult<Digest> {
        let route = RouteInfo::resolve(path);
        let address = collection_key(&route.route_digest);
        self.write_state()?
            .keys
            .entry(route.route_digest)
            .or_insert_with(|| route.path.clone());

        let state_value = StateValue::new(value)?;
        self.ensure_engine().await?;

        let mut collection = match self.engine.get(&address).await {
            Ok(Some(bytes)) => match Collection::from_bytes(&address, &bytes) {
                Ok(c) => c,
                Err(e) => {
                    warn!(%address, error = %e, "unreadable collection, starting fresh");
                    Collection::new()
                }
            },
            Ok(None) => Collection::new(),
            Err(e) => {
                warn!(%address, error = %e, "collection read failed, starting fresh");
                Collection::new()
            }
        };
        if !collection.is_empty() {
            collection.populate(self.engine.as_ref()).await?;
        }

        let height = collection.push(&state_value);
        self.persist(&entity_key(&state_value.id), state_value.serialized.clone())
            .await?;
        let list_bytes = collection.to_bytes()?;
        self.persist_stage("post", "collection", &address, list_bytes)
            .await?;

        debug!(path = %route.path, height, id = %state_value.id.short_hex(), "post");
        Ok(state_value.id)
    }

    /// Rehydrate the collection at a path, resolving member payloads.
    pub async fn collection(&self, path: &str) -> StoreResult<Collection> {
        let route = RouteInfo::resolve(path);
        let address = collection_key(&route.route_digest);
        self.ensure_engine().await?;
        let mut collection = match self.engine.get(&address).await? {
            Some(bytes) => Collection::from_bytes(&address, &bytes)?,
            None => Collection::new(),
        };
        if !collection.is_empty() {
            collection.populate(self.engine.as_ref()).await?;
        }
        Ok(collection)
    }

    /// Read an entity's value by its content identity.
    pub async fn entity(&self, id: &Digest) -> StoreResult<Option<Value>> {
        self.ensure_engine().await?;
        let address = entity_key(id);
        match self.engine.get(&address).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
                    address,
                    reason: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------
    // Stacks
    // -------------------------------------------------------------------

    /// Push a payload onto the ledger addressed by the path's route.
    ///
    /// The payload becomes an independently addressable entity, its raw
    /// bytes land at `/blobs/{id}`, the order list grows by one, and the
    /// stored payload is read back as confirmation. Prior blobs are never
    /// overwritten or removed.
    pub async fn push(&self, path: &str, data: Value) -> StoreResult<Value> {
        let route = RouteInfo::resolve(path);
        let address = stack_key(&route.route_digest);
        self.ensure_engine().await?;

        let mut stack = match self.engine.get(&address).await? {
            Some(bytes) => Stack::from_bytes(&address, &bytes)?,
            None => Stack::new(),
        };

        let state_value = StateValue::new(data)?;
        let depth = stack.push(state_value.id);
        {
            let mut state = self.write_state()?;
            state
                .keys
                .entry(route.route_digest)
                .or_insert_with(|| route.path.clone());
            state
                .documents
                .insert(state_value.id, state_value.value.clone());
        }

        self.persist(&entity_key(&state_value.id), state_value.serialized.clone())
            .await?;
        self.persist_stage(
            "push",
            "blob",
            &blob_key(&state_value.id),
            state_value.serialized.clone(),
        )
        .await?;
        let order_bytes = stack.to_bytes()?;
        self.persist_stage("push", "stack", &address, order_bytes)
            .await?;
        self.commit()?;

        // Read-after-write confirmation through the blob address.
        let blob_address = blob_key(&state_value.id);
        let stored = self
            .engine
            .get(&blob_address)
            .await?
            .ok_or_else(|| StoreError::Decode {
                address: blob_address.clone(),
                reason: "blob missing immediately after write".into(),
            })?;
        let payload = serde_json::from_slice(&stored).map_err(|e| StoreError::Decode {
            address: blob_address,
            reason: e.to_string(),
        })?;
        debug!(path = %route.path, depth, id = %state_value.id.short_hex(), "push");
        Ok(payload)
    }

    /// Store a raw byte payload, content-addressed in the value domain.
    ///
    /// The explicit binary entry point: the payload's kind tag is recorded
    /// as `binary`, never inferred from value shape. Returns the payload's
    /// content identity; the bytes land at `/blobs/{id}`.
    pub async fn put_blob(&self, bytes: Vec<u8>) -> StoreResult<Digest> {
        let id = DigestHasher::VALUE.hash(&bytes);
        self.persist(&blob_key(&id), bytes).await?;
        self.persist(&type_key(&id), ValueKind::Binary.tag().as_bytes().to_vec())
            .await?;
        debug!(id = %id.short_hex(), "put_blob");
        Ok(id)
    }

    /// Read a raw byte payload without decoding.
    pub async fn raw_blob(&self, id: &Digest) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_engine().await?;
        Ok(self.engine.get(&blob_key(id)).await?)
    }

    /// Read a pushed or mirrored payload by its content identity.
    pub async fn blob(&self, id: &Digest) -> StoreResult<Option<Value>> {
        self.ensure_engine().await?;
        let address = blob_key(id);
        match self.engine.get(&address).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
                    address,
                    reason: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Load the stack order list at a path (empty if absent).
    pub async fn stack(&self, path: &str) -> StoreResult<Stack> {
        let route = RouteInfo::resolve(path);
        let address = stack_key(&route.route_digest);
        self.ensure_engine().await?;
        match self.engine.get(&address).await? {
            Some(bytes) => Stack::from_bytes(&address, &bytes),
            None => Ok(Stack::new()),
        }
    }

    // -------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------

    /// Snapshot the aggregate state and notify subscribers.
    ///
    /// Builds a `commit` entity over the current aggregate, emits
    /// [`StoreEvent::Commit`], and persists nothing itself — the triggering
    /// operation already wrote what it needed. Synchronous over in-memory
    /// state; never blocks on the engine. Safe to call redundantly: with no
    /// intervening mutation the snapshot id is unchanged.
    pub fn commit(&self) -> StoreResult<CommitSnapshot> {
        let aggregate = {
            let state = self.read_state()?;
            let mut keys = Map::new();
            for (route, path) in &state.keys {
                keys.insert(route.to_hex(), Value::String(path.clone()));
            }
            json!({
                "content": state.content.clone(),
                "keys": Value::Object(keys),
                "actors": state.actors.len(),
                "documents": state.documents.len(),
            })
        };
        let entity = Entity::new("commit", aggregate);
        let id = DigestHasher::COMMIT.hash_canonical(&entity)?;
        self.router.publish(StoreEvent::Commit {
            id,
            data: entity.data.clone(),
        });
        debug!(id = %id.short_hex(), "commit");
        Ok(CommitSnapshot { id, entity })
    }

    // -------------------------------------------------------------------
    // Trust / mirroring
    // -------------------------------------------------------------------

    /// Subscribe to a foreign source's mutation stream and mirror it.
    ///
    /// Every observed `(key, value)` mutation is re-expressed in this
    /// store's content-addressed vocabulary via [`mirror`](Self::mirror).
    /// The consumer task is fire-and-forget: a failure to mirror one
    /// notification is logged and dropped, and the subscription survives.
    pub fn trust(
        self: Arc<Self>,
        source: &dyn MutationSource,
        label: impl Into<String>,
    ) -> tokio::task::JoinHandle<()> {
        let mut rx = source.subscribe();
        let store = self;
        let label = label.into();
        info!(%label, "trusting mutation source");
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(mutation) => {
                        if let Err(e) = store.mirror(&label, mutation).await {
                            warn!(%label, error = %e, "dropped mirrored mutation");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%label, skipped, "mirror subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Mirror one foreign mutation into this store's aggregate.
    ///
    /// Records the raw value at the source-scoped path, the value at
    /// `/states/{id}`, its canonical bytes at `/blobs/{id}`, its kind tag at
    /// `/types/{id}`, and the route mappings at `/tips/{route_digest}` and
    /// `/names/{route_digest}`; then re-emits the normalized
    /// [`MirrorRecord`].
    pub async fn mirror(&self, label: &str, mutation: Mutation) -> StoreResult<()> {
        let state_value = StateValue::new(mutation.value.clone())?;
        let route = RouteInfo::resolve(&mutation.key);
        let raw = serde_json::to_vec(&mutation.value).map_err(|e| StoreError::Decode {
            address: source_key(label, &route.escaped_pointer),
            reason: e.to_string(),
        })?;

        self.persist(&source_key(label, &route.escaped_pointer), raw.clone())
            .await?;
        self.persist(&state_key(&state_value.id), raw).await?;
        self.persist(&blob_key(&state_value.id), state_value.serialized.clone())
            .await?;
        self.persist(
            &type_key(&state_value.id),
            state_value.kind().tag().as_bytes().to_vec(),
        )
        .await?;
        self.persist(
            &tip_key(&route.route_digest),
            state_value.id.to_hex().into_bytes(),
        )
        .await?;
        self.persist(
            &name_key(&route.route_digest),
            route.escaped_pointer.clone().into_bytes(),
        )
        .await?;
        self.write_state()?
            .keys
            .entry(route.route_digest)
            .or_insert_with(|| route.path.clone());

        debug!(%label, key = %mutation.key, id = %state_value.id.short_hex(), "mirrored");
        self.router.publish(StoreEvent::Mirror(MirrorRecord {
            kind: "Request".into(),
            method: "put".into(),
            actor: label.to_string(),
            object: state_value.id,
            target: mutation.key,
            data: mutation.value,
        }));
        Ok(())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    /// Open the engine lazily and mark the store started.
    async fn ensure_engine(&self) -> StoreResult<()> {
        if self.status() == StoreStatus::Started {
            return Ok(());
        }
        self.set_status(StoreStatus::Starting)?;
        match self.engine.open().await {
            Ok(()) => {
                self.set_status(StoreStatus::Started)?;
                info!(path = %self.config.path, verbosity = self.config.verbosity, "store started");
                Ok(())
            }
            Err(e) => {
                self.set_status(StoreStatus::Error)?;
                Err(e.into())
            }
        }
    }

    /// Put bytes through the engine and remember the address for shutdown
    /// erasure.
    async fn persist(&self, address: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.ensure_engine().await?;
        self.engine.put(address, bytes).await?;
        self.write_state()?.addresses.insert(address.to_string());
        Ok(())
    }

    /// Like [`persist`](Self::persist), but an engine failure is reported as
    /// a partial write at the named stage of a multi-step operation.
    async fn persist_stage(
        &self,
        operation: &'static str,
        stage: &'static str,
        address: &str,
        bytes: Vec<u8>,
    ) -> StoreResult<()> {
        self.persist(address, bytes).await.map_err(|e| match e {
            StoreError::Engine(source) => StoreError::PartialWrite {
                operation,
                stage,
                source,
            },
            other => other,
        })
    }

    fn set_status(&self, status: StoreStatus) -> StoreResult<()> {
        self.write_state()?.status = status;
        Ok(())
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

/// Top-level keys of `partial` override `current`; nested structures are
/// replaced wholesale.
fn shallow_merge(current: Value, partial: Value) -> Value {
    match (current, partial) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, partial) => partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySource;
    use cask_engine::MemoryEngine;
    use serde_json::json;

    fn test_store() -> Arc<Store> {
        Arc::new(Store::new(
            StoreConfig::default(),
            Arc::new(MemoryEngine::new()),
        ))
    }

    /// Engine double that injects failures into selected operations.
    struct FaultyEngine {
        inner: MemoryEngine,
        put_failures: std::sync::atomic::AtomicUsize,
        fail_close: bool,
    }

    impl FaultyEngine {
        fn failing_puts(n: usize) -> Self {
            Self {
                inner: MemoryEngine::new(),
                put_failures: std::sync::atomic::AtomicUsize::new(n),
                fail_close: false,
            }
        }

        fn failing_close() -> Self {
            Self {
                inner: MemoryEngine::new(),
                put_failures: std::sync::atomic::AtomicUsize::new(0),
                fail_close: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl AddressableEngine for FaultyEngine {
        async fn open(&self) -> Result<(), cask_engine::EngineError> {
            self.inner.open().await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, cask_engine::EngineError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), cask_engine::EngineError> {
            use std::sync::atomic::Ordering;
            if self.put_failures.load(Ordering::SeqCst) > 0 {
                self.put_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(cask_engine::EngineError::Backend(
                    "injected put failure".into(),
                ));
            }
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<bool, cask_engine::EngineError> {
            self.inner.delete(key).await
        }

        async fn batch(&self, ops: &[BatchOp]) -> Result<(), cask_engine::EngineError> {
            self.inner.batch(ops).await
        }

        async fn iterate(&self) -> Result<Vec<(String, Vec<u8>)>, cask_engine::EngineError> {
            self.inner.iterate().await
        }

        async fn close(&self) -> Result<(), cask_engine::EngineError> {
            if self.fail_close {
                return Err(cask_engine::EngineError::Backend(
                    "injected close failure".into(),
                ));
            }
            self.inner.close().await
        }
    }

    // -------------------------------------------------------------------
    // get / set / patch / delete
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = test_store();
        store.set("/a/b", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("/a/b").unwrap(), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn set_returns_the_freshly_read_value() {
        let store = test_store();
        let returned = store.set("/doc", json!({"n": 7})).await.unwrap();
        assert_eq!(returned, json!({"n": 7}));
    }

    #[test]
    fn get_without_metadata_is_none() {
        let store = test_store();
        assert_eq!(store.get("/never/written").unwrap(), None);
    }

    #[tokio::test]
    async fn patch_shallow_merges() {
        let store = test_store();
        store.set("/a/b", json!({"x": 1})).await.unwrap();

        let merged = store.patch("/a/b", json!({"y": 2})).await.unwrap();
        assert_eq!(merged, json!({"x": 1, "y": 2}));

        // Nested structures replace wholesale — the old `x` is gone.
        let merged = store.patch("/a/b", json!({"x": {"z": 3}})).await.unwrap();
        assert_eq!(merged, json!({"x": {"z": 3}, "y": 2}));
    }

    #[tokio::test]
    async fn patch_on_absent_path_starts_from_empty_record() {
        let store = test_store();
        let merged = store.patch("/new", json!({"a": 1})).await.unwrap();
        assert_eq!(merged, json!({"a": 1}));
    }

    #[tokio::test]
    async fn delete_tombstones_but_keeps_route_records() {
        let store = test_store();
        store.set("/a/b", json!({"x": 1})).await.unwrap();
        store.delete("/a/b").unwrap();

        assert_eq!(store.get("/a/b").unwrap(), None);
        // Route metadata and registration survive the tombstone.
        assert!(store.metadata_for("/a/b").unwrap().is_some());
        let route = store.route_info("/a/b");
        assert_eq!(
            store.lookup_route(&route.route_digest).unwrap(),
            Some("/a/b".to_string())
        );
    }

    #[tokio::test]
    async fn delete_of_unwritten_route_is_inert() {
        let store = test_store();
        store.set("/a", json!(1)).await.unwrap();
        let before = store.commit().unwrap();

        store.delete("/never/touched").unwrap();

        // No tombstone landed and the snapshot identity is unperturbed.
        assert_eq!(store.commit().unwrap().id, before.id);
        assert!(store.metadata_for("/never/touched").unwrap().is_none());
    }

    #[tokio::test]
    async fn content_reuse_shares_one_document_entry() {
        let store = test_store();
        store.set("/first", json!({"same": true})).await.unwrap();
        store.set("/second", json!({"same": true})).await.unwrap();

        let a = store.route_info("/first").route_digest;
        let b = store.route_info("/second").route_digest;
        assert_ne!(a, b);
        // Both routes point at the same content digest.
        assert_eq!(
            store.metadata_for("/first").unwrap().unwrap().hash,
            store.metadata_for("/second").unwrap().unwrap().hash
        );
    }

    // -------------------------------------------------------------------
    // post / collections
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn post_grows_height_by_one_each_call() {
        let store = test_store();
        let id1 = store.post("/notes", json!({"n": 1})).await.unwrap();
        let id2 = store.post("/notes", json!({"n": 2})).await.unwrap();
        assert_ne!(id1, id2);

        let collection = store.collection("/notes").await.unwrap();
        assert_eq!(collection.height(), 2);
        assert_eq!(collection.member_ids(), &[id1, id2]);
    }

    #[tokio::test]
    async fn posted_values_resolve_independently() {
        let store = test_store();
        let id1 = store.post("/notes", json!({"n": 1})).await.unwrap();
        let id2 = store.post("/notes", json!({"n": 2})).await.unwrap();

        assert_eq!(store.entity(&id1).await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(store.entity(&id2).await.unwrap(), Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn post_same_value_twice_appends_twice() {
        let store = test_store();
        let id1 = store.post("/dups", json!("v")).await.unwrap();
        let id2 = store.post("/dups", json!("v")).await.unwrap();
        // Same content identity, two positions in the version history.
        assert_eq!(id1, id2);
        let collection = store.collection("/dups").await.unwrap();
        assert_eq!(collection.height(), 2);
    }

    #[tokio::test]
    async fn collections_on_different_paths_are_independent() {
        let store = test_store();
        store.post("/a", json!(1)).await.unwrap();
        store.post("/b", json!(2)).await.unwrap();
        assert_eq!(store.collection("/a").await.unwrap().height(), 1);
        assert_eq!(store.collection("/b").await.unwrap().height(), 1);
    }

    // -------------------------------------------------------------------
    // push / stacks
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn push_returns_the_stored_payload() {
        let store = test_store();
        let stored = store.push("/ledger", json!({"v": 1})).await.unwrap();
        assert_eq!(stored, json!({"v": 1}));
    }

    #[tokio::test]
    async fn earlier_blobs_survive_later_pushes() {
        let store = test_store();
        store.push("/ledger", json!("first")).await.unwrap();
        let first_id = StateValue::new(json!("first")).unwrap().id;
        store.push("/ledger", json!("second")).await.unwrap();

        assert_eq!(store.blob(&first_id).await.unwrap(), Some(json!("first")));
        let stack = store.stack("/ledger").await.unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top(), Some(&StateValue::new(json!("second")).unwrap().id));
    }

    #[tokio::test]
    async fn pushed_values_are_entities_too() {
        let store = test_store();
        store.push("/ledger", json!({"p": 1})).await.unwrap();
        let id = StateValue::new(json!({"p": 1})).unwrap().id;
        assert_eq!(store.entity(&id).await.unwrap(), Some(json!({"p": 1})));
    }

    #[tokio::test]
    async fn put_blob_stores_raw_bytes_with_a_binary_tag() {
        let store = test_store();
        let payload = vec![0x00, 0xff, 0x10, 0x7f];

        let id = store.put_blob(payload.clone()).await.unwrap();

        assert_eq!(store.raw_blob(&id).await.unwrap(), Some(payload));
        // Binary is only ever recorded through this entry point.
        assert_eq!(
            store.engine.get(&type_key(&id)).await.unwrap(),
            Some(b"binary".to_vec())
        );
    }

    #[tokio::test]
    async fn put_blob_identity_is_content_derived() {
        let store = test_store();
        let a = store.put_blob(vec![1, 2, 3]).await.unwrap();
        let b = store.put_blob(vec![1, 2, 3]).await.unwrap();
        assert_eq!(a, b);
    }

    // -------------------------------------------------------------------
    // commit
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn commit_is_stable_without_mutation() {
        let store = test_store();
        store.set("/a", json!(1)).await.unwrap();
        let c1 = store.commit().unwrap();
        let c2 = store.commit().unwrap();
        assert_eq!(c1.id, c2.id);
    }

    #[tokio::test]
    async fn commit_changes_after_mutation() {
        let store = test_store();
        let c1 = store.commit().unwrap();
        store.set("/a", json!(1)).await.unwrap();
        let c2 = store.commit().unwrap();
        assert_ne!(c1.id, c2.id);
        assert_eq!(c2.entity.kind, "commit");
    }

    #[tokio::test]
    async fn commits_notify_subscribers_in_order() {
        let store = test_store();
        let mut rx = store.subscribe();

        store.set("/a", json!(1)).await.unwrap();
        store.set("/b", json!(2)).await.unwrap();

        let mut commit_ids = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StoreEvent::Commit { id, .. } = event {
                commit_ids.push(id);
            }
        }
        assert_eq!(commit_ids.len(), 2);
        assert_ne!(commit_ids[0], commit_ids[1]);
    }

    // -------------------------------------------------------------------
    // trust / mirroring
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn mirror_records_all_five_facts() {
        let store = test_store();
        store
            .mirror(
                "upstream",
                Mutation {
                    key: "k".into(),
                    value: json!("v"),
                },
            )
            .await
            .unwrap();

        let state_value = StateValue::new(json!("v")).unwrap();
        let route = store.route_info("k");

        let engine = store.engine.clone();
        // Tip maps the route to the content id.
        let tip = engine.get(&tip_key(&route.route_digest)).await.unwrap();
        assert_eq!(tip, Some(state_value.id.to_hex().into_bytes()));
        // Name maps the route back to the escaped key.
        let name = engine.get(&name_key(&route.route_digest)).await.unwrap();
        assert_eq!(name, Some(b"/k".to_vec()));
        // Value, canonical bytes, and kind tag, all content-addressed.
        assert!(engine.get(&state_key(&state_value.id)).await.unwrap().is_some());
        assert_eq!(
            engine.get(&blob_key(&state_value.id)).await.unwrap(),
            Some(state_value.serialized.clone())
        );
        assert_eq!(
            engine.get(&type_key(&state_value.id)).await.unwrap(),
            Some(b"text".to_vec())
        );
        // And the source-scoped raw copy.
        assert!(engine.get("/upstream/k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mirror_emits_the_normalized_record() {
        let store = test_store();
        let mut rx = store.subscribe();

        store
            .mirror(
                "upstream",
                Mutation {
                    key: "users/alice".into(),
                    value: json!({"name": "alice"}),
                },
            )
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            StoreEvent::Mirror(record) => {
                assert_eq!(record.kind, "Request");
                assert_eq!(record.method, "put");
                assert_eq!(record.actor, "upstream");
                assert_eq!(record.target, "users/alice");
                assert_eq!(record.data, json!({"name": "alice"}));
                assert_eq!(
                    record.object,
                    StateValue::new(json!({"name": "alice"})).unwrap().id
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn trust_mirrors_a_live_source() {
        let store = test_store();
        let source = MemorySource::default();
        let handle = Arc::clone(&store).trust(&source, "upstream");
        let mut rx = store.subscribe();

        source.put("k", json!("v"));

        // Wait for the mirror notification to flow through the task.
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("mirror event timed out")
            .unwrap();
        match event {
            StoreEvent::Mirror(record) => assert_eq!(record.target, "k"),
            other => panic!("unexpected event: {other:?}"),
        }

        let route = store.route_info("k");
        let tip = store.engine.get(&tip_key(&route.route_digest)).await.unwrap();
        let expected = StateValue::new(json!("v")).unwrap().id;
        assert_eq!(tip, Some(expected.to_hex().into_bytes()));

        drop(source);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn trust_keeps_consuming_after_a_dropped_mirror() {
        let store = Arc::new(Store::new(
            StoreConfig::default(),
            Arc::new(FaultyEngine::failing_puts(1)),
        ));
        let source = MemorySource::default();
        let handle = Arc::clone(&store).trust(&source, "upstream");
        let mut rx = store.subscribe();

        // The first mutation hits the injected engine failure and is
        // dropped; the subscription must survive to mirror the second.
        source.put("a", json!(1));
        source.put("b", json!(2));

        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("mirror event timed out")
            .unwrap();
        match event {
            StoreEvent::Mirror(record) => assert_eq!(record.target, "b"),
            other => panic!("unexpected event: {other:?}"),
        }

        // The dropped mutation left no tip behind.
        let lost = store.route_info("a");
        assert_eq!(
            store.engine.get(&tip_key(&lost.route_digest)).await.unwrap(),
            None
        );

        drop(source);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn trust_survives_after_source_closes() {
        let store = test_store();
        let source = MemorySource::default();
        let handle = Arc::clone(&store).trust(&source, "upstream");
        drop(source);
        // The consumer task ends cleanly when the source channel closes.
        handle.await.unwrap();
    }

    // -------------------------------------------------------------------
    // lifecycle
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn status_transitions_through_lifecycle() {
        let store = test_store();
        assert_eq!(store.status(), StoreStatus::Paused);
        store.start().await.unwrap();
        assert_eq!(store.status(), StoreStatus::Started);
        store.stop().await.unwrap();
        assert_eq!(store.status(), StoreStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_without_start_is_safe() {
        let store = test_store();
        store.stop().await.unwrap();
        assert_eq!(store.status(), StoreStatus::Stopped);
    }

    #[tokio::test]
    async fn failing_close_parks_the_store_in_error() {
        let store = Store::new(
            StoreConfig::default(),
            Arc::new(FaultyEngine::failing_close()),
        );
        store.start().await.unwrap();
        assert!(store.stop().await.is_err());
        assert_eq!(store.status(), StoreStatus::Error);
    }

    #[tokio::test]
    async fn lazy_open_happens_on_first_engine_use() {
        let store = test_store();
        assert_eq!(store.status(), StoreStatus::Paused);
        store.post("/c", json!(1)).await.unwrap();
        assert_eq!(store.status(), StoreStatus::Started);
    }

    #[tokio::test]
    async fn non_persistent_stop_erases_written_addresses() {
        let engine = Arc::new(MemoryEngine::new());
        let store = Arc::new(Store::new(
            StoreConfig::default().ephemeral(),
            engine.clone(),
        ));

        let id = store.post("/notes", json!({"n": 1})).await.unwrap();
        assert!(!engine.is_empty());

        store.stop().await.unwrap();
        assert!(engine.is_empty());

        // The entity address is gone too.
        engine.open().await.unwrap();
        assert_eq!(engine.get(&entity_key(&id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn persistent_stop_keeps_engine_contents() {
        let engine = Arc::new(MemoryEngine::new());
        let store = Arc::new(Store::new(StoreConfig::default(), engine.clone()));
        store.post("/notes", json!(1)).await.unwrap();
        store.stop().await.unwrap();
        assert!(!engine.is_empty());
    }

    #[tokio::test]
    async fn stores_are_independent() {
        let s1 = test_store();
        let s2 = test_store();
        s1.set("/a", json!(1)).await.unwrap();
        assert_eq!(s2.get("/a").unwrap(), None);
    }

    // -------------------------------------------------------------------
    // shallow_merge
    // -------------------------------------------------------------------

    #[test]
    fn shallow_merge_replaces_nested_wholesale() {
        let merged = shallow_merge(json!({"x": {"a": 1}, "y": 2}), json!({"x": {"b": 3}}));
        assert_eq!(merged, json!({"x": {"b": 3}, "y": 2}));
    }

    #[test]
    fn shallow_merge_non_record_yields_partial() {
        assert_eq!(shallow_merge(json!(5), json!({"a": 1})), json!({"a": 1}));
        assert_eq!(shallow_merge(json!({"a": 1}), json!(5)), json!(5));
    }
}
