//! rangecache Storage - Cache Storage Trait and In-Memory Engine
//!
//! Defines the storage contract behind the entity cache and the ephemeral
//! implementation used for sessions that must not persist anything.
//!
//! - [`CacheStorage`]: entity, range, ownership and sync bookkeeping operations
//! - [`EphemeralCacheStorage`]: in-memory engine, wiped on `deinit`
//! - [`ListRange`]: the verified-range record of a single list
//! - [`RangeLockTable`]: per-list mutual exclusion for multi-step range work

pub mod ephemeral;
pub mod list_range;
pub mod lock;
pub mod traits;

pub use ephemeral::EphemeralCacheStorage;
pub use list_range::{BlobList, ListRange};
pub use lock::{RangeLockGuard, RangeLockTable};
pub use traits::{CacheStorage, CacheStorageExt};
