use std::sync::Arc;

use focus_store::{Command, HashFields, KvStore};
use focus_types::{KeyCodec, ObjectType};
use tracing::warn;

use crate::error::CacheResult;
use crate::fields::{decode, encode, Fields, TypeTable};

/// Reads and writes the flat field map of single entities.
#[derive(Clone)]
pub struct EntityHash {
    store: Arc<dyn KvStore>,
    codec: KeyCodec,
    table: Arc<TypeTable>,
}

impl EntityHash {
    pub fn new(store: Arc<dyn KvStore>, codec: KeyCodec, table: Arc<TypeTable>) -> Self {
        Self {
            store,
            codec,
            table,
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// Clean and flatten `value` into the command that writes it.
    ///
    /// Returns `None` when nothing survives cleaning; a hash write with no
    /// fields is not a valid store command. Validation findings are logged
    /// with the target key and payload and do not stop the write.
    pub fn write_command(
        &self,
        ty: ObjectType,
        name: &str,
        value: Fields,
    ) -> CacheResult<Option<Command>> {
        let key = self.codec.key(ty, name);
        let config = self.table.config(ty);
        let cleaned = config.cleaner.clean(value);
        let (hash, unlisted) = encode(&cleaned.fields, &config.stringify)?;

        let mut invalid = cleaned.invalid;
        invalid.extend(unlisted);
        if !invalid.is_empty() {
            warn!(
                key = %key,
                fields = ?invalid,
                payload = ?hash,
                "writing hash with invalid values"
            );
        }

        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(Command::hset(key, hash)))
    }

    /// Overwrite the fields of the entity's hash with the cleaned `value`.
    pub async fn write(&self, ty: ObjectType, name: &str, value: Fields) -> CacheResult<()> {
        if let Some(command) = self.write_command(ty, name, value)? {
            self.store.execute(command).await?;
        }
        Ok(())
    }

    /// Read the entity's fields. A missing entity reads as an empty map.
    pub async fn read(&self, ty: ObjectType, name: &str) -> CacheResult<Fields> {
        let key = self.codec.key(ty, name);
        let hash = self.store.hgetall(&key).await?;
        Ok(self.decode(ty, &key, hash))
    }

    /// Decode a raw hash fetched for `key` elsewhere (e.g. in a fan-out).
    pub fn decode(&self, ty: ObjectType, key: &str, hash: HashFields) -> Fields {
        decode(key, hash, &self.table.config(ty).stringify)
    }

    /// Store a single string value instead of a hash.
    pub async fn write_scalar(&self, ty: ObjectType, name: &str, value: &str) -> CacheResult<()> {
        let key = self.codec.key(ty, name);
        self.store.set(&key, value).await?;
        Ok(())
    }

    pub async fn read_scalar(&self, ty: ObjectType, name: &str) -> CacheResult<Option<String>> {
        let key = self.codec.key(ty, name);
        Ok(self.store.get(&key).await?)
    }
}

impl std::fmt::Debug for EntityHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHash")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
