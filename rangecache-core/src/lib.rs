//! rangecache Core - Entity and Identity Types
//!
//! Data types shared by the cache engine and its callers: identifiers and
//! their ordering, the stored entity record, type metadata, range value
//! types, configuration and errors. No storage logic lives here.

pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod range;
pub mod resolver;

pub use config::{CacheConfig, RangeLocking};
pub use entity::{CacheableEntity, Entity, EntityKey, TypeKind, TypeModel, TypeRef};
pub use error::{CacheError, CacheResult, ConfigError, SerializationError, StorageError};
pub use identity::{
    first_bigger_than_second, BatchId, ElementId, GroupId, ListId, UserId, GENERATED_MAX_ID,
    GENERATED_MIN_ID,
};
pub use range::{Direction, LastUpdateTime, RangeBounds, RangeEdge};
pub use resolver::{StaticTypeResolver, TypeResolver};
