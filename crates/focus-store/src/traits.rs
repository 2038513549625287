use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::command::{Command, HashFields, Reply};
use crate::error::StoreResult;

/// Client for a key/value store with hashes, sets and strings.
///
/// Implementations must satisfy these invariants:
/// - `execute_batch` applies its commands in order, as one unit: either all
///   take effect or none do, and nothing interleaves with them.
/// - Replies are positional: reply `i` belongs to command `i`.
/// - A failed batch reports the index of the first failing command.
/// - Store errors are returned as-is; implementations do not retry.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Run one command.
    async fn execute(&self, command: Command) -> StoreResult<Reply>;

    /// Run an ordered list of commands atomically.
    async fn execute_batch(&self, commands: Vec<Command>) -> StoreResult<Vec<Reply>>;

    async fn hgetall(&self, key: &str) -> StoreResult<HashFields> {
        self.execute(Command::hgetall(key)).await?.into_hash()
    }

    async fn hset(&self, key: &str, fields: HashFields) -> StoreResult<()> {
        self.execute(Command::hset(key, fields)).await.map(|_| ())
    }

    /// Returns `true` if the field existed.
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self.execute(Command::hdel(key, field)).await?.into_integer()? > 0)
    }

    /// Returns `true` if the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.execute(Command::sadd(key, member)).await?.into_integer()? > 0)
    }

    /// Returns `true` if the member was present.
    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.execute(Command::srem(key, member)).await?.into_integer()? > 0)
    }

    async fn smembers(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        self.execute(Command::smembers(key)).await?.into_members()
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.execute(Command::sismember(key, member))
            .await?
            .into_bool()
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        self.execute(Command::rename(from, to)).await.map(|_| ())
    }

    /// Returns `true` if the key existed.
    async fn del(&self, key: &str) -> StoreResult<bool> {
        Ok(self.execute(Command::del(key)).await?.into_integer()? > 0)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.execute(Command::get(key)).await?.into_value()
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.execute(Command::set(key, value)).await.map(|_| ())
    }
}
