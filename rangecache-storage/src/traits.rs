//! The cache storage contract.
//!
//! [`CacheStorage`] is the surface the caching facade talks to. The in-memory
//! [`EphemeralCacheStorage`](crate::EphemeralCacheStorage) implements it; a
//! persistent engine must implement the same semantics.

use crate::lock::RangeLockGuard;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rangecache_core::{
    BatchId, CacheResult, CacheableEntity, Direction, ElementId, Entity, GroupId,
    LastUpdateTime, ListId, RangeBounds, RangeEdge, TypeRef, UserId,
};

/// Storage behind the entity cache.
///
/// "Not cached" is always `None` or an empty `Vec`, never an error. An empty
/// range read means "nothing verified locally", not "the list is empty";
/// consult [`get_range_for_list`](Self::get_range_for_list) to tell the two
/// apart. Errors are contract violations by the caller.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    // ========================================================================
    // ENTITY OPERATIONS
    // ========================================================================

    /// Get a copy of a cached entity. `list_id` is required for list and
    /// blob element types and ignored for element types.
    async fn get(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&ListId>,
        id: &ElementId,
    ) -> CacheResult<Option<Entity>>;

    /// Store a copy of an entity, overwriting any previous version.
    ///
    /// A list element inside its list's verified range becomes part of the
    /// range; outside, only its body is stored.
    async fn put(&self, entity: &Entity) -> CacheResult<()>;

    /// Remove an entity (and its place in the verified range) if cached.
    async fn delete_if_exists(
        &self,
        type_ref: &TypeRef,
        list_id: Option<&ListId>,
        id: &ElementId,
    ) -> CacheResult<()>;

    // ========================================================================
    // RANGE OPERATIONS
    // ========================================================================

    /// Up to `count` copies strictly beyond `start` in `direction`, drawn
    /// only from the verified range.
    async fn provide_from_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        start: &ElementId,
        count: usize,
        direction: Direction,
    ) -> CacheResult<Vec<Entity>>;

    /// Bounds of the verified range, or `None` if the list is not cached.
    async fn get_range_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
    ) -> CacheResult<Option<RangeBounds>>;

    /// Replace the verified range. Creates the list if needed; otherwise the
    /// known ids are reset while loaded bodies stay.
    async fn set_new_range_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        lower: &ElementId,
        upper: &ElementId,
    ) -> CacheResult<()>;

    /// Move one edge of an existing range. Fails if the list is not cached.
    async fn set_range_edge_for_list(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        edge: RangeEdge,
        id: &ElementId,
    ) -> CacheResult<()>;

    /// Whether `id` lies inside the list's verified range.
    async fn is_element_id_in_cache_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
        id: &ElementId,
    ) -> CacheResult<bool>;

    /// The ids known inside the verified range, ascending.
    async fn get_ids_in_range(
        &self,
        type_ref: &TypeRef,
        list_id: &ListId,
    ) -> CacheResult<Vec<ElementId>>;

    /// Copies of every entity in the verified range, ascending.
    async fn get_whole_list(&self, type_ref: &TypeRef, list_id: &ListId)
        -> CacheResult<Vec<Entity>>;

    // ========================================================================
    // OWNERSHIP & SYNC BOOKKEEPING
    // ========================================================================

    /// Evict everything owned by `owner`. A list holding any entity of the
    /// owner is dropped whole, range included.
    async fn delete_all_owned_by(&self, owner: &GroupId) -> CacheResult<()>;

    async fn get_last_batch_id_for_group(&self, group: &GroupId) -> CacheResult<Option<BatchId>>;

    async fn put_last_batch_id_for_group(&self, group: &GroupId, batch_id: &BatchId)
        -> CacheResult<()>;

    async fn get_last_update_time(&self) -> CacheResult<LastUpdateTime>;

    async fn put_last_update_time(&self, time: DateTime<Utc>) -> CacheResult<()>;

    // ========================================================================
    // SESSION & LOCKING
    // ========================================================================

    /// Owner of the current session.
    fn user_id(&self) -> CacheResult<UserId>;

    /// Serialize range work on `list_id` against other tasks. The lock is
    /// held until the guard is dropped.
    async fn lock_range_access(&self, list_id: &ListId) -> RangeLockGuard;
}

/// Typed access on top of [`CacheStorage`].
#[async_trait]
pub trait CacheStorageExt: CacheStorage {
    async fn get_typed<T: CacheableEntity>(
        &self,
        list_id: Option<&ListId>,
        id: &ElementId,
    ) -> CacheResult<Option<T>> {
        match self.get(&T::type_ref(), list_id, id).await? {
            Some(entity) => Ok(Some(entity.to_cacheable()?)),
            None => Ok(None),
        }
    }

    async fn put_typed<T: CacheableEntity>(&self, entity: &T) -> CacheResult<()> {
        let record = Entity::from_cacheable(entity)?;
        self.put(&record).await
    }

    async fn provide_typed<T: CacheableEntity>(
        &self,
        list_id: &ListId,
        start: &ElementId,
        count: usize,
        direction: Direction,
    ) -> CacheResult<Vec<T>> {
        self.provide_from_range(&T::type_ref(), list_id, start, count, direction)
            .await?
            .iter()
            .map(|entity| entity.to_cacheable::<T>())
            .collect()
    }
}

impl<S: CacheStorage + ?Sized> CacheStorageExt for S {}
