use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Flat field map held at a hash key.
pub type HashFields = BTreeMap<String, String>;

/// A single store command.
///
/// Commands are plain data so they can be built in one place, collected into
/// a batch, and executed somewhere else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Read every field of a hash. A missing key reads as an empty hash.
    HGetAll { key: String },
    /// Overwrite the given fields of a hash, creating it if needed.
    HSet { key: String, fields: HashFields },
    /// Remove one field from a hash.
    HDel { key: String, field: String },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    SMembers { key: String },
    SIsMember { key: String, member: String },
    /// Move the value at `from` to `to`, replacing whatever `to` held.
    Rename { from: String, to: String },
    Del { key: String },
    Get { key: String },
    Set { key: String, value: String },
    /// Fail unless the set at `key` has exactly `members` (missing = empty).
    ///
    /// Placed first in a batch, this turns the batch into a conditional
    /// apply: a mismatch rejects the whole batch.
    ExpectMembers {
        key: String,
        members: BTreeSet<String>,
    },
}

impl Command {
    pub fn hgetall(key: impl Into<String>) -> Self {
        Self::HGetAll { key: key.into() }
    }

    pub fn hset(key: impl Into<String>, fields: HashFields) -> Self {
        Self::HSet {
            key: key.into(),
            fields,
        }
    }

    pub fn hdel(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::HDel {
            key: key.into(),
            field: field.into(),
        }
    }

    pub fn sadd(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SAdd {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn srem(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SRem {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn smembers(key: impl Into<String>) -> Self {
        Self::SMembers { key: key.into() }
    }

    pub fn sismember(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SIsMember {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        Self::Del { key: key.into() }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn expect_members<I, S>(key: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ExpectMembers {
            key: key.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Short command name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HGetAll { .. } => "HGETALL",
            Self::HSet { .. } => "HSET",
            Self::HDel { .. } => "HDEL",
            Self::SAdd { .. } => "SADD",
            Self::SRem { .. } => "SREM",
            Self::SMembers { .. } => "SMEMBERS",
            Self::SIsMember { .. } => "SISMEMBER",
            Self::Rename { .. } => "RENAME",
            Self::Del { .. } => "DEL",
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::ExpectMembers { .. } => "EXPECTMEMBERS",
        }
    }

    /// Keys this command may modify.
    pub fn written_keys(&self) -> Vec<&str> {
        match self {
            Self::HSet { key, .. }
            | Self::HDel { key, .. }
            | Self::SAdd { key, .. }
            | Self::SRem { key, .. }
            | Self::Del { key }
            | Self::Set { key, .. } => vec![key.as_str()],
            Self::Rename { from, to } => vec![from.as_str(), to.as_str()],
            Self::HGetAll { .. }
            | Self::SMembers { .. }
            | Self::SIsMember { .. }
            | Self::Get { .. }
            | Self::ExpectMembers { .. } => Vec::new(),
        }
    }
}

/// The result of one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Integer(i64),
    Bool(bool),
    Value(Option<String>),
    Hash(HashFields),
    Members(BTreeSet<String>),
}

impl Reply {
    pub fn into_hash(self) -> StoreResult<HashFields> {
        match self {
            Reply::Hash(fields) => Ok(fields),
            other => Err(other.unexpected("hash")),
        }
    }

    pub fn into_members(self) -> StoreResult<BTreeSet<String>> {
        match self {
            Reply::Members(members) => Ok(members),
            other => Err(other.unexpected("members")),
        }
    }

    pub fn into_bool(self) -> StoreResult<bool> {
        match self {
            Reply::Bool(b) => Ok(b),
            other => Err(other.unexpected("bool")),
        }
    }

    pub fn into_integer(self) -> StoreResult<i64> {
        match self {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected("integer")),
        }
    }

    pub fn into_value(self) -> StoreResult<Option<String>> {
        match self {
            Reply::Value(v) => Ok(v),
            other => Err(other.unexpected("value")),
        }
    }

    fn unexpected(&self, expected: &'static str) -> StoreError {
        StoreError::UnexpectedReply {
            expected,
            actual: self.to_string(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Integer(n) => write!(f, "integer {n}"),
            Reply::Bool(b) => write!(f, "bool {b}"),
            Reply::Value(Some(_)) => f.write_str("value"),
            Reply::Value(None) => f.write_str("nil"),
            Reply::Hash(h) => write!(f, "hash of {} fields", h.len()),
            Reply::Members(m) => write!(f, "set of {} members", m.len()),
        }
    }
}
