//! Indexed entity cache for subjects, aspects and samples.
//!
//! Typed entities live in a flat key/value store as field hashes. Alongside
//! them the cache keeps a master index set per type (membership is the only
//! test of existence) and two relation set families recording which
//! subject/aspect pairs have a sample. Multi-key changes are submitted as
//! ordered batches that the store applies atomically.
//!
//! # Modules
//!
//! - [`fields`] -- field model, per-type cleaners and stringify tables
//! - [`hash`] -- [`EntityHash`] reads and writes single entities
//! - [`mapping`] -- relation set command primitives
//! - [`index`] -- master index membership commands
//! - [`batch`] -- [`Batch`] and [`BatchExecutor`]
//! - [`fanout`] -- bounded parallel hash reads
//! - [`facade`] -- [`CacheFacade`], the operations the API layer calls
//!
//! # Invariants
//!
//! 1. Writers never leave an index entry without a hash or a hash without an
//!    index entry.
//! 2. A rename leaves exactly the new key, in the index and the hash store.
//! 3. A subject or aspect cascade leaves no sample hash or sample index entry
//!    that it discovered.

pub mod batch;
pub mod config;
pub mod error;
pub mod facade;
pub mod fanout;
pub mod fields;
pub mod hash;
pub mod index;
pub mod mapping;

pub use batch::{Batch, BatchExecutor};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use facade::CacheFacade;
pub use fields::{Cleaned, Cleaner, DefaultCleaner, Fields, TypeConfig, TypeTable};
pub use hash::EntityHash;
pub use index::IndexOps;
pub use mapping::MappingSet;

pub use focus_store::{Command, InMemoryKvStore, KvStore, Reply, StoreError};
pub use focus_types::{ObjectType, SampleName, SampleParent};
