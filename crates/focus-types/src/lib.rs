//! Foundation types for the focus sample cache.
//!
//! Every entity the cache knows about is addressed by an [`ObjectType`] and a
//! name. This crate turns that pair into flat store keys and knows which
//! master index set tracks the live keys of each type.
//!
//! # Key Types
//!
//! - [`ObjectType`]: closed set of cached entity kinds
//! - [`SampleName`]: compound `subject|aspect` sample name
//! - [`KeyCodec`]: builds and parses namespaced store keys
//! - [`IndexRegistry`]: per-type master index lookup

pub mod error;
pub mod key;
pub mod object;
pub mod sample;

pub use error::TypeError;
pub use key::{normalize_name, IndexRegistry, KeyCodec, DEFAULT_NAMESPACE};
pub use object::ObjectType;
pub use sample::{SampleName, SampleParent, SAMPLE_NAME_SEPARATOR};
