//! Error types for cache operations
//!
//! Absence is never an error here: lookups return `Option` or an empty `Vec`.
//! Everything below is a contract violation by the caller (or a broken
//! configuration) and is not retried.

use thiserror::Error;

/// Storage contract violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Type {type_ref} could not be resolved: {reason}")]
    UnresolvableType { type_ref: String, reason: String },

    #[error("Type {type_ref} is {kind}, must be a persistent type")]
    NotPersistent { type_ref: String, kind: String },

    #[error("Type {type_ref} is {kind}, only list element types have ranges")]
    NotRangeTracked { type_ref: String, kind: String },

    #[error("Type {type_ref} is a list type but no list id was given")]
    MissingListId { type_ref: String },

    #[error("Type {type_ref} is an element type but was keyed by list {list_id}")]
    UnexpectedListId { type_ref: String, list_id: String },

    #[error("List {list_id} of {type_ref} does not exist")]
    ListNotFound { type_ref: String, list_id: String },

    #[error("Inverted range for list {list_id}: lower {lower} is after upper {upper}")]
    InvertedRange {
        list_id: String,
        lower: String,
        upper: String,
    },

    #[error("No user id, storage not initialized")]
    NotInitialized,

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Typed entity conversion errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Failed to encode {type_ref}: {reason}")]
    Encode { type_ref: String, reason: String },

    #[error("Failed to decode {type_ref}: {reason}")]
    Decode { type_ref: String, reason: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
}

/// Master error type for the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
