/// Errors from key/value store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The key holds a value of a different kind than the command expects.
    #[error("wrong kind of value at {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// A command that requires an existing key found none.
    #[error("no such key: {0}")]
    NoSuchKey(String),

    /// The command was malformed (e.g. a hash write with no fields).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An `ExpectMembers` guard saw a set different from the expected one.
    #[error("guard failed: members of {key} changed")]
    GuardFailed { key: String },

    /// One command inside a batch failed; nothing in the batch was applied.
    #[error("batch command {index} failed: {source}")]
    CommandFailed {
        index: usize,
        #[source]
        source: Box<StoreError>,
    },

    /// A reply did not have the shape the caller asked for.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: String,
    },

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The error of the failing command, unwrapping a batch failure.
    pub fn root(&self) -> &StoreError {
        match self {
            StoreError::CommandFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
