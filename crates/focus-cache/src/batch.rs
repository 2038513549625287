use std::sync::Arc;

use focus_store::{Command, KvStore, Reply};
use tracing::debug;

use crate::error::CacheResult;

/// An ordered list of commands to submit as one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Push a command that may not apply to every type.
    pub fn push_opt(&mut self, command: Option<Command>) -> &mut Self {
        if let Some(command) = command {
            self.commands.push(command);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl Extend<Command> for Batch {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.commands.extend(iter);
    }
}

impl From<Vec<Command>> for Batch {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

/// Submits batches to the store.
///
/// Atomicity comes from the store's batch contract; nothing here locks or
/// retries. A failed batch surfaces the store error unchanged.
#[derive(Clone)]
pub struct BatchExecutor {
    store: Arc<dyn KvStore>,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, batch: Batch) -> CacheResult<Vec<Reply>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        debug!(commands = batch.len(), "submitting batch");
        Ok(self.store.execute_batch(batch.into_commands()).await?)
    }
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor").finish_non_exhaustive()
    }
}
