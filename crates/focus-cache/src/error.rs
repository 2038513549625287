use focus_store::StoreError;
use focus_types::{ObjectType, TypeError};
use thiserror::Error;

/// Errors returned by cache operations.
///
/// A missing entity is never an error: single-entity reads return an empty
/// field map instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The operation is not defined for this object type.
    #[error("{operation} does not support object type {ty}")]
    UnsupportedType {
        operation: &'static str,
        ty: ObjectType,
    },

    /// A guarded cascade found its relation set changed since it was read.
    #[error("relation {key} changed between read and delete")]
    Conflict { key: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A fan-out read task panicked or was cancelled.
    #[error("fan-out task failed: {0}")]
    Task(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
