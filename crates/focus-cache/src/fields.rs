//! Entity field model and the per-type cleaning table.
//!
//! Callers hand the cache structured JSON objects ([`Fields`]); the store
//! holds flat string hashes. Before a write, the type's [`Cleaner`]
//! normalizes the object, then [`encode`] flattens it: fields named in the
//! type's stringify set are JSON-encoded whatever they hold, other scalars
//! keep their text form. On read, [`decode`] reverses the JSON encoding for
//! the same fields.

use std::collections::BTreeSet;
use std::sync::Arc;

use focus_store::HashFields;
use focus_types::ObjectType;
use serde_json::Value;
use tracing::warn;

use crate::error::{CacheError, CacheResult};

/// A structured entity as seen by callers.
pub type Fields = serde_json::Map<String, Value>;

/// Output of a [`Cleaner`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cleaned {
    pub fields: Fields,
    /// Names of fields that failed validation. They are still written.
    pub invalid: Vec<String>,
}

/// Per-type normalization applied before every hash write.
///
/// Findings never block a write; they are reported through
/// [`Cleaned::invalid`] and logged by the caller.
pub trait Cleaner: Send + Sync {
    fn clean(&self, value: Fields) -> Cleaned;
}

/// Drops `null` fields and any field on its drop list.
#[derive(Clone, Debug, Default)]
pub struct DefaultCleaner {
    drop: BTreeSet<String>,
}

impl DefaultCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also remove these fields on every write.
    pub fn dropping<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            drop: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Cleaner for DefaultCleaner {
    fn clean(&self, value: Fields) -> Cleaned {
        let fields = value
            .into_iter()
            .filter(|(k, v)| !v.is_null() && !self.drop.contains(k))
            .collect();
        Cleaned {
            fields,
            invalid: Vec::new(),
        }
    }
}

/// How one object type is cleaned and (de)stringified.
#[derive(Clone)]
pub struct TypeConfig {
    pub cleaner: Arc<dyn Cleaner>,
    pub stringify: BTreeSet<String>,
}

impl TypeConfig {
    pub fn new(cleaner: Arc<dyn Cleaner>, stringify: &[&str]) -> Self {
        Self {
            cleaner,
            stringify: stringify.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl std::fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeConfig")
            .field("stringify", &self.stringify)
            .finish_non_exhaustive()
    }
}

/// One [`TypeConfig`] per [`ObjectType`], selected by exhaustive match.
#[derive(Clone, Debug)]
pub struct TypeTable {
    subject: TypeConfig,
    aspect: TypeConfig,
    sample: TypeConfig,
    subject_aspect_mapping: TypeConfig,
    aspect_subject_mapping: TypeConfig,
}

impl TypeTable {
    pub fn config(&self, ty: ObjectType) -> &TypeConfig {
        match ty {
            ObjectType::Subject => &self.subject,
            ObjectType::Aspect => &self.aspect,
            ObjectType::Sample => &self.sample,
            ObjectType::SubjectAspectMapping => &self.subject_aspect_mapping,
            ObjectType::AspectSubjectMapping => &self.aspect_subject_mapping,
        }
    }

    fn config_mut(&mut self, ty: ObjectType) -> &mut TypeConfig {
        match ty {
            ObjectType::Subject => &mut self.subject,
            ObjectType::Aspect => &mut self.aspect,
            ObjectType::Sample => &mut self.sample,
            ObjectType::SubjectAspectMapping => &mut self.subject_aspect_mapping,
            ObjectType::AspectSubjectMapping => &mut self.aspect_subject_mapping,
        }
    }

    pub fn with_cleaner(mut self, ty: ObjectType, cleaner: Arc<dyn Cleaner>) -> Self {
        self.config_mut(ty).cleaner = cleaner;
        self
    }

    pub fn with_stringify(mut self, ty: ObjectType, fields: &[&str]) -> Self {
        self.config_mut(ty).stringify = fields.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        let plain: Arc<dyn Cleaner> = Arc::new(DefaultCleaner::new());
        Self {
            subject: TypeConfig::new(
                Arc::new(DefaultCleaner::dropping(["children"])),
                &["tags", "relatedLinks", "geolocation"],
            ),
            aspect: TypeConfig::new(
                plain.clone(),
                &[
                    "tags",
                    "relatedLinks",
                    "criticalRange",
                    "warningRange",
                    "infoRange",
                    "okRange",
                ],
            ),
            sample: TypeConfig::new(plain.clone(), &["relatedLinks"]),
            subject_aspect_mapping: TypeConfig::new(plain.clone(), &[]),
            aspect_subject_mapping: TypeConfig::new(plain, &[]),
        }
    }
}

/// Flatten cleaned fields into a store hash.
///
/// Every field on the stringify list is stored as its JSON text, whatever
/// its value, so [`decode`] restores it exactly. Other fields keep the text
/// form of their scalar. Returns the hash and the names of structured fields
/// that were not on the list; those are JSON-encoded anyway.
pub fn encode(fields: &Fields, stringify: &BTreeSet<String>) -> CacheResult<(HashFields, Vec<String>)> {
    let mut hash = HashFields::new();
    let mut invalid = Vec::new();
    for (name, value) in fields {
        if value.is_null() {
            continue;
        }
        let text = if stringify.contains(name) {
            to_json(value)?
        } else {
            match value {
                Value::String(s) => s.clone(),
                Value::Array(_) | Value::Object(_) => {
                    invalid.push(name.clone());
                    to_json(value)?
                }
                _ => value.to_string(),
            }
        };
        hash.insert(name.clone(), text);
    }
    Ok((hash, invalid))
}

fn to_json(value: &Value) -> CacheResult<String> {
    serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Rebuild structured fields from a store hash.
pub fn decode(key: &str, hash: HashFields, stringify: &BTreeSet<String>) -> Fields {
    hash.into_iter()
        .map(|(name, text)| {
            let value = if stringify.contains(&name) {
                match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(key, field = %name, error = %e, "stringified field did not parse");
                        Value::String(text)
                    }
                }
            } else {
                Value::String(text)
            };
            (name, value)
        })
        .collect()
}
