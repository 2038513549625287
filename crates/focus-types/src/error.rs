use thiserror::Error;

/// Errors produced by type and key operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("invalid sample name {name:?}: expected `subject|aspect`")]
    InvalidSampleName { name: String },

    #[error("malformed key: {0}")]
    MalformedKey(String),
}
