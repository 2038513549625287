//! Key/value store client seam for the focus sample cache.
//!
//! The cache never talks to a concrete store directly. It builds [`Command`]
//! values and hands them to a [`KvStore`], either one at a time or as an
//! ordered batch that the store applies as one indivisible unit.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- lock-guarded map for tests and embedding
//!
//! # Batch Contract
//!
//! 1. Commands run in the order supplied; replies come back positionally.
//! 2. If any command fails, no command in the batch takes effect and the
//!    caller gets [`StoreError::CommandFailed`] naming the failing index.
//! 3. No other batch or single command interleaves with a running batch.

pub mod command;
pub mod error;
pub mod memory;
pub mod traits;

pub use command::{Command, HashFields, Reply};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
