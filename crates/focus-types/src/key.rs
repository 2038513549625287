//! Store key construction.
//!
//! Keys have the shape `namespace:token:name` where `token` is the object
//! type's [`key_token`](ObjectType::key_token) and `name` is lowercased, which
//! makes every entity addressable case-insensitively. An empty namespace
//! drops the leading segment.

use crate::error::TypeError;
use crate::object::ObjectType;
use crate::sample::{SampleName, SAMPLE_NAME_SEPARATOR};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "samsto";

/// Lowercase a name the way keys store it.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// Builds and parses namespaced store keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCodec {
    namespace: String,
}

impl KeyCodec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn prefix(&self, token: &str) -> String {
        if self.namespace.is_empty() {
            format!("{token}:")
        } else {
            format!("{}:{token}:", self.namespace)
        }
    }

    /// Key for `name` under `ty`. Pure and infallible.
    pub fn key(&self, ty: ObjectType, name: &str) -> String {
        let mut key = self.prefix(ty.key_token());
        key.push_str(&normalize_name(name));
        key
    }

    /// Key of the sample for a subject/aspect pair.
    pub fn sample_key(&self, subject: &str, aspect: &str) -> String {
        self.key(
            ObjectType::Sample,
            &format!("{subject}{SAMPLE_NAME_SEPARATOR}{aspect}"),
        )
    }

    /// Split a key back into its object type and (lowercased) name.
    pub fn parse(&self, key: &str) -> Result<(ObjectType, String), TypeError> {
        let rest = if self.namespace.is_empty() {
            key
        } else {
            key.strip_prefix(self.namespace.as_str())
                .and_then(|r| r.strip_prefix(':'))
                .ok_or_else(|| TypeError::MalformedKey(key.to_string()))?
        };
        let (token, name) = rest
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedKey(key.to_string()))?;
        let ty = ObjectType::from_key_token(token)
            .ok_or_else(|| TypeError::MalformedKey(key.to_string()))?;
        Ok((ty, name.to_string()))
    }

    /// Parse a sample key into its subject and aspect parts.
    pub fn parse_sample_key(&self, key: &str) -> Result<SampleName, TypeError> {
        match self.parse(key)? {
            (ObjectType::Sample, name) => SampleName::parse(&name),
            _ => Err(TypeError::MalformedKey(key.to_string())),
        }
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Per-type lookup of master index set names.
///
/// Only subjects, aspects and samples have a master index; the relation
/// types are tracked solely by their own sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRegistry {
    namespace: String,
}

impl IndexRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn index_for(&self, ty: ObjectType) -> Option<String> {
        let plural = match ty {
            ObjectType::Subject => "subjects",
            ObjectType::Aspect => "aspects",
            ObjectType::Sample => "samples",
            ObjectType::SubjectAspectMapping | ObjectType::AspectSubjectMapping => return None,
        };
        Some(if self.namespace.is_empty() {
            plural.to_string()
        } else {
            format!("{}:{plural}", self.namespace)
        })
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
