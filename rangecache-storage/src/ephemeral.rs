//! In-memory cache storage.
//!
//! Holds everything for one session in process memory. Every operation runs
//! under a single state lock and never suspends, so each call is atomic with
//! respect to the others; only [`CacheStorage::lock_range_access`] waits.

use crate::list_range::{BlobList, ListRange};
use crate::lock::{RangeLockGuard, RangeLockTable};
use crate::traits::CacheStorage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rangecache_core::{
    BatchId, CacheConfig, CacheResult, Direction, ElementId, Entity, EntityKey, GroupId,
    LastUpdateTime, ListId, RangeBounds, RangeEdge, StorageError, TypeKind, TypeRef, TypeResolver,
    UserId,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persistent storage classes. Resolved from [`TypeKind`] once per call so
/// every operation matches on exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredKind {
    Element,
    ListElement,
    BlobElement,
}

#[derive(Debug, Default)]
struct CacheState {
    user_id: Option<UserId>,
    entities: HashMap<TypeRef, HashMap<ElementId, Entity>>,
    lists: HashMap<TypeRef, HashMap<ListId, ListRange>>,
    blobs: HashMap<TypeRef, HashMap<ListId, BlobList>>,
    last_update_time: Option<DateTime<Utc>>,
    last_batch_id_per_group: HashMap<GroupId, BatchId>,
}

impl CacheState {
    fn list(&self, type_ref: &TypeRef, list_id: &ListId) -> Option<&ListRange> {
        self.lists.get(type_ref)?.get(list_id)
    }

    fn list_mut(&mut self, type_ref: &TypeRef, list_id: &ListId) -> Option<&mut ListRange> {
        self.lists.get_mut(type_ref)?.get_mut(list_id)
    }
}

/// In-memory [`CacheStorage`] for one session.
///
/// Call [`init`](Self::init) when a user logs in and [`deinit`](Self::deinit)
/// on logout; `deinit` drops every record and all sync bookkeeping at once.
pub struct EphemeralCacheStorage {
    resolver: Arc<dyn TypeResolver>,
    config: CacheConfig,
    kinds: RwLock<HashMap<TypeRef, TypeKind>>,
    state: RwLock<CacheState>,
    locks: RangeLockTable,
}

impl std::fmt::Debug for EphemeralCacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralCacheStorage")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl EphemeralCacheStorage {
    /// Create a storage with a validated configuration.
    pub fn new(resolver: Arc<dyn TypeResolver>, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::build(resolver, config))
    }

    /// Create a storage with the default configuration.
    pub fn with_defaults(resolver: Arc<dyn TypeResolver>) -> Self {
        Self::build(resolver, CacheConfig::default())
    }

    fn build(resolver: Arc<dyn TypeResolver>, config: CacheConfig) -> Self {
        let locks = RangeLockTable::new(config.range_locking, config.slow_lock_threshold);
        Self {
            resolver,
            config,
            kinds: RwLock::new(HashMap::new()),
            state: RwLock::new(CacheState::default()),
            locks,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The per-list lock table backing [`CacheStorage::lock_range_access`].
    pub fn range_locks(&self) -> &RangeLockTable {
        &self.locks
    }

    /// Start a session for `user_id`.
    pub fn init(&self, user_id: UserId) -> CacheResult<()> {
        let mut state = self.write_state()?;
        if let Some(previous) = &state.user_id {
            tracing::warn!(
                previous = %previous,
                user_id = %user_id,
                "Cache initialized over a live session, discarding it"
            );
            self.reset(&mut state)?;
        }
        tracing::info!(user_id = %user_id, "Cache storage initialized");
        state.user_id = Some(user_id);
        Ok(())
    }

    /// End the session: drop all records, sync bookkeeping and resolved
    /// type kinds.
    pub fn deinit(&self) -> CacheResult<()> {
        let mut state = self.write_state()?;
        if let Some(user_id) = &state.user_id {
            tracing::info!(user_id = %user_id, "Cache storage deinitialized");
        }
        self.reset(&mut state)
    }

    fn read_state(&self) -> CacheResult<RwLockReadGuard<'_, CacheState>> {
        Ok(self.state.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write_state(&self) -> CacheResult<RwLockWriteGuard<'_, CacheState>> {
        Ok(self.state.write().map_err(|_| StorageError::LockPoisoned)?)
    }

    /// Resolve a type once per session, then serve it from the memo.
    fn stored_kind(&self, type_ref: &TypeRef) -> CacheResult<StoredKind> {
        let cached = self
            .kinds
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .get(type_ref)
            .copied();
        let kind = match cached {
            Some(kind) => kind,
            None => {
                let model = self.resolver.resolve(type_ref)?;
                self.kinds
                    .write()
                    .map_err(|_| StorageError::LockPoisoned)?
                    .insert(type_ref.clone(), model.kind);
                model.kind
            }
        };

        match kind {
            TypeKind::Element => Ok(StoredKind::Element),
            TypeKind::ListElement => Ok(StoredKind::ListElement),
            TypeKind::BlobElement => Ok(StoredKind::BlobElement),
            TypeKind::Aggregated | TypeKind::DataTransfer => Err(StorageError::NotPersistent {
                type_ref: type_ref.to_string(),
                kind: kind.to_string(),
            }
            .into()),
        }
    }

    fn clamp_count(&self, count: usize) -> usize {
        count.min(self.config.max_page_size)
    }

    /// Range records exist only for list element types.
    fn require_range_tracked(&self, type_ref: &TypeRef) -> CacheResult<()> {
        let kind = match self.stored_kind(type_ref)? {
            StoredKind::ListElement => return Ok(()),
            StoredKind::Element => TypeKind::Element,
            StoredKind::BlobElement => TypeKind::BlobElement,
        };
        Err(StorageError::NotRangeTracked {
            type_ref: type_ref.to_string(),
            kind: kind.to_string(),
        }
        .into())
    }

    /// Wipe session state together with the resolved kinds. The caller holds
    /// the state lock.
    fn reset(&self, state: &mut CacheState) -> CacheResult<()> {
        *state = CacheState::default();
        self.kinds
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

fn require_list_id<'a>(type_ref: &TypeRef, list_id: Option<&'a ListId>) -> CacheResult<&'a ListId> {
    list_id.ok_or_else(|| {
        StorageError::MissingListId {
            type_ref: type_ref.to_string(),
        }
        .into()
    })
}

/// Drop every list that holds at least one entity of `owner`, including
/// entities of other owners in the same list.
fn evict_lists_owned_by<L>(
    lists: &mut HashMap<TypeRef, HashMap<ListId, L>>,
    owner: &GroupId,
    has_owner: impl Fn(&L, &GroupId) -> bool,
) -> usize {
    let mut evicted = 0;
    for lists_for_type in lists.values_mut() {
        let before = lists_for_type.len();
        lists_for_type.retain(|_, list| !has_owner(list, owner));
        evicted += before - lists_for_type.len();
    }
    evicted
}

#[async_trait]
impl CacheStorage for EphemeralCacheStorage {
    async fn get(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&ListId>,
        id: &ElementId,
    ) -> CacheResult<Option<Entity>> {
        let kind = self.stored_kind(type_ref)?;
        let state = self.read_state()?;
        let entity = match kind {
            StoredKind::Element => state.entities.get(type_ref).and_then(|m| m.get(id)),
            StoredKind::ListElement => {
                let list_id = require_list_id(type_ref, list_id)?;
                state.list(type_ref, list_id).and_then(|list| list.get(id))
            }
            StoredKind::BlobElement => {
                let list_id = require_list_id(type_ref, list_id)?;
                state
                    .blobs
                    .get(type_ref)
                    .and_then(|m| m.get(list_id))
                    .and_then(|blobs| blobs.get(id))
            }
        };
        Ok(entity.cloned())
    }

    async fn put(&self, entity: &Entity) -> CacheResult<()> {
        let kind = self.stored_kind(&entity.type_ref)?;
        let entity = entity.clone();
        let mut state = self.write_state()?;

        match kind {
            StoredKind::Element => {
                if let EntityKey::List(list_id, _) = &entity.key {
                    return Err(StorageError::UnexpectedListId {
                        type_ref: entity.type_ref.to_string(),
                        list_id: list_id.to_string(),
                    }
                    .into());
                }
                state
                    .entities
                    .entry(entity.type_ref.clone())
                    .or_default()
                    .insert(entity.element_id().clone(), entity);
            }
            StoredKind::ListElement => {
                let list_id = require_list_id(&entity.type_ref, entity.list_id())?.clone();
                let lists = state.lists.entry(entity.type_ref.clone()).or_default();
                match lists.entry(list_id) {
                    Entry::Vacant(vacant) => {
                        tracing::debug!(
                            type_ref = %entity.type_ref,
                            list_id = %vacant.key(),
                            element_id = %entity.element_id(),
                            "First element of list, starting range"
                        );
                        vacant.insert(ListRange::with_first_element(entity));
                    }
                    Entry::Occupied(mut occupied) => occupied.get_mut().put(entity),
                }
            }
            StoredKind::BlobElement => {
                let list_id = require_list_id(&entity.type_ref, entity.list_id())?.clone();
                state
                    .blobs
                    .entry(entity.type_ref.clone())
                    .or_default()
                    .entry(list_id)
                    .or_default()
                    .put(entity);
            }
        }
        Ok(())
    }

    async fn delete_if_exists(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&ListId>,
        id: &ElementId,
    ) -> CacheResult<()> {
        let kind = self.stored_kind(type_ref)?;
        let mut state = self.write_state()?;
        match kind {
            StoredKind::Element => {
                if let Some(entities) = state.entities.get_mut(type_ref) {
                    entities.remove(id);
                }
            }
            StoredKind::ListElement => {
                let list_id = require_list_id(type_ref, list_id)?;
                if let Some(list) = state.list_mut(type_ref, list_id) {
                    list.remove(id);
                }
            }
            StoredKind::BlobElement => {
                let list_id = require_list_id(type_ref, list_id)?;
                let blobs = state.blobs.get_mut(type_ref).and_then(|m| m.get_mut(list_id));
                if let Some(blobs) = blobs {
                    blobs.remove(id);
                }
            }
        }
        Ok(())
    }

    async fn provide_from_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        start: &ElementId,
        count: usize,
        direction: Direction,
    ) -> CacheResult<Vec<Entity>> {
        self.require_range_tracked(type_ref)?;
        let count = self.clamp_count(count);
        let state = self.read_state()?;
        Ok(state
            .list(type_ref, list_id)
            .map(|list| list.provide(start, count, direction))
            .unwrap_or_default())
    }

    async fn get_range_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
    ) -> CacheResult<Option<RangeBounds>> {
        self.require_range_tracked(type_ref)?;
        let state = self.read_state()?;
        Ok(state.list(type_ref, list_id).map(|list| list.bounds().clone()))
    }

    async fn set_new_range_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        lower: &ElementId,
        upper: &ElementId,
    ) -> CacheResult<()> {
        self.require_range_tracked(type_ref)?;
        let bounds = RangeBounds::new(lower.clone(), upper.clone());
        if bounds.is_inverted() {
            return Err(StorageError::InvertedRange {
                list_id: list_id.to_string(),
                lower: lower.to_string(),
                upper: upper.to_string(),
            }
            .into());
        }

        tracing::debug!(
            type_ref = %type_ref,
            list_id = %list_id,
            lower = %lower,
            upper = %upper,
            "Setting new range for list"
        );
        let mut state = self.write_state()?;
        let lists = state.lists.entry(type_ref.clone()).or_default();
        match lists.entry(list_id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(ListRange::with_bounds(bounds));
            }
            Entry::Occupied(mut occupied) => occupied.get_mut().reset_bounds(bounds),
        }
        Ok(())
    }

    async fn set_range_edge_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        edge: RangeEdge,
        id: &ElementId,
    ) -> CacheResult<()> {
        self.require_range_tracked(type_ref)?;
        let mut state = self.write_state()?;
        let list = state
            .list_mut(type_ref, list_id)
            .ok_or_else(|| StorageError::ListNotFound {
                type_ref: type_ref.to_string(),
                list_id: list_id.to_string(),
            })?;

        list.set_edge(edge, id.clone()).map_err(|rejected| StorageError::InvertedRange {
            list_id: list_id.to_string(),
            lower: rejected.lower.to_string(),
            upper: rejected.upper.to_string(),
        })?;
        tracing::debug!(
            type_ref = %type_ref,
            list_id = %list_id,
            edge = ?edge,
            id = %id,
            "Moved range edge"
        );
        Ok(())
    }

    async fn is_element_id_in_cache_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        id: &ElementId,
    ) -> CacheResult<bool> {
        self.require_range_tracked(type_ref)?;
        let state = self.read_state()?;
        Ok(state
            .list(type_ref, list_id)
            .is_some_and(|list| list.contains_in_bounds(id)))
    }

    async fn get_ids_in_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
    ) -> CacheResult<Vec<ElementId>> {
        self.require_range_tracked(type_ref)?;
        let state = self.read_state()?;
        Ok(state
            .list(type_ref, list_id)
            .map(|list| list.known_ids().to_vec())
            .unwrap_or_default())
    }

    async fn get_whole_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
    ) -> CacheResult<Vec<Entity>> {
        self.require_range_tracked(type_ref)?;
        let state = self.read_state()?;
        Ok(state
            .list(type_ref, list_id)
            .map(ListRange::whole_list)
            .unwrap_or_default())
    }

    async fn delete_all_owned_by(&self, owner: &GroupId) -> CacheResult<()> {
        let mut state = self.write_state()?;

        let mut evicted_entities = 0;
        for entities in state.entities.values_mut() {
            let before = entities.len();
            entities.retain(|_, entity| !entity.is_owned_by(owner));
            evicted_entities += before - entities.len();
        }
        let evicted_lists = evict_lists_owned_by(&mut state.lists, owner, ListRange::has_owner);
        let evicted_blob_lists = evict_lists_owned_by(&mut state.blobs, owner, BlobList::has_owner);
        state.last_batch_id_per_group.remove(owner);

        tracing::info!(
            owner = %owner,
            evicted_entities,
            evicted_lists,
            evicted_blob_lists,
            "Evicted cached data of owner group"
        );
        Ok(())
    }

    async fn get_last_batch_id_for_group(&self, group: &GroupId) -> CacheResult<Option<BatchId>> {
        let state = self.read_state()?;
        Ok(state.last_batch_id_per_group.get(group).cloned())
    }

    async fn put_last_batch_id_for_group(
        &self,
        group: &GroupId,
        batch_id: &BatchId,
    ) -> CacheResult<()> {
        let mut state = self.write_state()?;
        state
            .last_batch_id_per_group
            .insert(group.clone(), batch_id.clone());
        Ok(())
    }

    async fn get_last_update_time(&self) -> CacheResult<LastUpdateTime> {
        let state = self.read_state()?;
        Ok(LastUpdateTime::from(state.last_update_time))
    }

    async fn put_last_update_time(&self, time: DateTime<Utc>) -> CacheResult<()> {
        let mut state = self.write_state()?;
        state.last_update_time = Some(time);
        Ok(())
    }

    fn user_id(&self) -> CacheResult<UserId> {
        let state = self.read_state()?;
        state
            .user_id
            .clone()
            .ok_or_else(|| StorageError::NotInitialized.into())
    }

    async fn lock_range_access(&self, list_id: &ListId) -> RangeLockGuard {
        self.locks.acquire(list_id).await
    }
}
