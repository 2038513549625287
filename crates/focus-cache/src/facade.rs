//! The cache operations consumed by the API layer.
//!
//! Every mutation that touches more than one key goes out as a single
//! [`Batch`], so the store applies it as one unit. The relation cascades are
//! the exception by necessity: they read the relation set first and delete in
//! a second batch, and a sample linked between the two steps is not removed.
//! [`CacheFacade::delete_sample_keys_checked`] closes that window by guarding
//! the second batch on the set read in the first.

use std::collections::BTreeSet;
use std::sync::Arc;

use focus_store::{Command, KvStore, Reply, StoreError};
use focus_types::{normalize_name, IndexRegistry, KeyCodec, ObjectType, SampleParent};
use tracing::{debug, info, warn};

use crate::batch::{Batch, BatchExecutor};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::fanout::read_hashes;
use crate::fields::{Fields, TypeTable};
use crate::hash::EntityHash;
use crate::index::IndexOps;
use crate::mapping::MappingSet;

pub struct CacheFacade {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
    codec: KeyCodec,
    indexes: IndexOps,
    hashes: EntityHash,
    mappings: MappingSet,
    executor: BatchExecutor,
}

impl CacheFacade {
    /// Build a facade over an injected store client.
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let codec = KeyCodec::new(config.namespace.clone());
        let registry = IndexRegistry::new(config.namespace.clone());
        info!(
            namespace = %config.namespace,
            fanout = config.effective_fanout(),
            "cache facade ready"
        );
        Self {
            hashes: EntityHash::new(
                Arc::clone(&store),
                codec.clone(),
                Arc::new(TypeTable::default()),
            ),
            indexes: IndexOps::new(codec.clone(), registry),
            mappings: MappingSet::new(codec.clone()),
            executor: BatchExecutor::new(Arc::clone(&store)),
            store,
            config,
            codec,
        }
    }

    /// Replace the per-type cleaning and stringify table.
    pub fn with_type_table(mut self, table: TypeTable) -> Self {
        self.hashes = EntityHash::new(Arc::clone(&self.store), self.codec.clone(), Arc::new(table));
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Single-set relation primitives, for callers composing their own batches.
    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    pub fn key(&self, ty: ObjectType, name: &str) -> String {
        self.codec.key(ty, name)
    }

    // ---------------------------------------------------------------
    // Entity hashes
    // ---------------------------------------------------------------

    pub async fn write(&self, ty: ObjectType, name: &str, value: Fields) -> CacheResult<()> {
        self.hashes.write(ty, name, value).await
    }

    pub async fn read(&self, ty: ObjectType, name: &str) -> CacheResult<Fields> {
        self.hashes.read(ty, name).await
    }

    pub async fn write_scalar(&self, ty: ObjectType, name: &str, value: &str) -> CacheResult<()> {
        self.hashes.write_scalar(ty, name, value).await
    }

    pub async fn read_scalar(&self, ty: ObjectType, name: &str) -> CacheResult<Option<String>> {
        self.hashes.read_scalar(ty, name).await
    }

    /// Create or update an entity: index membership and hash write together.
    ///
    /// When cleaning leaves no fields, nothing is written, so an index entry
    /// is never created without a hash behind it.
    pub async fn upsert(&self, ty: ObjectType, name: &str, value: Fields) -> CacheResult<()> {
        let Some(write) = self.hashes.write_command(ty, name, value)? else {
            return Ok(());
        };
        let mut batch = Batch::new();
        batch.push_opt(self.indexes.add(ty, name)).push(write);
        self.executor.execute(batch).await?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Master index membership
    // ---------------------------------------------------------------

    /// No-op for types without a master index.
    pub async fn add_to_index(&self, ty: ObjectType, name: &str) -> CacheResult<()> {
        if let Some(command) = self.indexes.add(ty, name) {
            self.store.execute(command).await?;
        }
        Ok(())
    }

    /// No-op for types without a master index.
    pub async fn remove_from_index(&self, ty: ObjectType, name: &str) -> CacheResult<()> {
        if let Some(command) = self.indexes.remove(ty, name) {
            self.store.execute(command).await?;
        }
        Ok(())
    }

    pub async fn exists_in_index(&self, ty: ObjectType, name: &str) -> CacheResult<bool> {
        let command = self
            .indexes
            .contains(ty, name)
            .ok_or(CacheError::UnsupportedType {
                operation: "exists_in_index",
                ty,
            })?;
        Ok(self.store.execute(command).await?.into_bool()?)
    }

    /// Every live key of `ty`.
    pub async fn index_members(&self, ty: ObjectType) -> CacheResult<BTreeSet<String>> {
        let index = self
            .indexes
            .index_for(ty)
            .ok_or(CacheError::UnsupportedType {
                operation: "index_members",
                ty,
            })?;
        Ok(self.store.smembers(&index).await?)
    }

    // ---------------------------------------------------------------
    // Relations
    // ---------------------------------------------------------------

    /// Record that `subject` samples `aspect`, in both directions at once.
    pub async fn link_sample(&self, subject: &str, aspect: &str) -> CacheResult<()> {
        let batch = Batch::from(self.mappings.link(subject, aspect).to_vec());
        self.executor.execute(batch).await?;
        Ok(())
    }

    pub async fn unlink_sample(&self, subject: &str, aspect: &str) -> CacheResult<()> {
        let batch = Batch::from(self.mappings.unlink(subject, aspect).to_vec());
        self.executor.execute(batch).await?;
        Ok(())
    }

    /// `true` only when both directions record the pair.
    pub async fn is_linked(&self, subject: &str, aspect: &str) -> CacheResult<bool> {
        let batch = Batch::from(vec![
            self.mappings.subject_in_aspect(aspect, subject),
            self.mappings.aspect_in_subject(subject, aspect),
        ]);
        let mut linked = true;
        for reply in self.executor.execute(batch).await? {
            linked &= reply.into_bool()?;
        }
        Ok(linked)
    }

    // ---------------------------------------------------------------
    // Composite operations
    // ---------------------------------------------------------------

    /// Drop an entity's index entry and hash. Idempotent.
    pub async fn delete_key(&self, ty: ObjectType, name: &str) -> CacheResult<()> {
        let mut batch = Batch::new();
        batch
            .push_opt(self.indexes.remove(ty, name))
            .push(Command::del(self.codec.key(ty, name)));
        self.executor.execute(batch).await?;
        Ok(())
    }

    /// Move an entity to a new name in one batch.
    ///
    /// If the old hash does not exist the store rejects the rename and the
    /// index changes in the same batch are not applied.
    pub async fn rename_key(&self, ty: ObjectType, old_name: &str, new_name: &str) -> CacheResult<()> {
        let mut batch = Batch::new();
        batch
            .push_opt(self.indexes.remove(ty, old_name))
            .push_opt(self.indexes.add(ty, new_name))
            .push(Command::rename(
                self.codec.key(ty, old_name),
                self.codec.key(ty, new_name),
            ));
        self.executor.execute(batch).await?;
        Ok(())
    }

    /// Delete every sample reachable through the relation set of `name`.
    ///
    /// `assoc` is [`ObjectType::SubjectAspectMapping`] (`name` is a subject)
    /// or [`ObjectType::AspectSubjectMapping`] (`name` is an aspect). Returns
    /// the contents of the samples that existed when they were read.
    ///
    /// Two phases: the relation set and the sample hashes are read, then one
    /// batch removes the samples from the master index, deletes their
    /// hashes, deletes the relation set and removes `name` from the reverse
    /// sets. The phases are not one atomic unit; a sample linked after the
    /// read survives the call.
    pub async fn delete_sample_keys(&self, assoc: ObjectType, name: &str) -> CacheResult<Vec<Fields>> {
        self.cascade_relation(assoc, name, false).await
    }

    /// [`delete_sample_keys`](Self::delete_sample_keys) with the delete batch
    /// guarded on the relation set being unchanged since it was read.
    ///
    /// Fails with [`CacheError::Conflict`], deleting nothing, if it changed.
    pub async fn delete_sample_keys_checked(
        &self,
        assoc: ObjectType,
        name: &str,
    ) -> CacheResult<Vec<Fields>> {
        self.cascade_relation(assoc, name, true).await
    }

    async fn cascade_relation(
        &self,
        assoc: ObjectType,
        name: &str,
        guarded: bool,
    ) -> CacheResult<Vec<Fields>> {
        let reverse = assoc.reverse_mapping().ok_or(CacheError::UnsupportedType {
            operation: if guarded {
                "delete_sample_keys_checked"
            } else {
                "delete_sample_keys"
            },
            ty: assoc,
        })?;
        let relation_key = self.codec.key(assoc, name);

        // Phase 1: discover affected samples and snapshot them.
        let members = self.store.smembers(&relation_key).await?;
        let sample_keys: Vec<String> = members
            .iter()
            .map(|member| match assoc {
                ObjectType::SubjectAspectMapping => self.codec.sample_key(name, member),
                _ => self.codec.sample_key(member, name),
            })
            .collect();
        debug!(relation = %relation_key, samples = sample_keys.len(), "cascade discovered samples");
        let snapshots = read_hashes(
            Arc::clone(&self.store),
            sample_keys.clone(),
            self.config.effective_fanout(),
        )
        .await?;

        // Phase 2: one batch removes everything discovered.
        let mut batch = Batch::new();
        if guarded {
            batch.push(Command::expect_members(relation_key.clone(), members.iter().cloned()));
        }
        for key in &sample_keys {
            batch
                .push_opt(self.indexes.remove_key(ObjectType::Sample, key.clone()))
                .push(Command::del(key.clone()));
        }
        batch.push(Command::del(relation_key.clone()));
        let own = normalize_name(name);
        for member in &members {
            batch.push(Command::srem(self.codec.key(reverse, member), own.clone()));
        }

        match self.executor.execute(batch).await {
            Err(CacheError::Store(e)) if matches!(e.root(), StoreError::GuardFailed { .. }) => {
                return Err(CacheError::Conflict { key: relation_key });
            }
            result => {
                result?;
            }
        }

        Ok(snapshots
            .into_iter()
            .filter(|(_, hash)| !hash.is_empty())
            .map(|(key, hash)| self.hashes.decode(ObjectType::Sample, &key, hash))
            .collect())
    }

    /// Delete every sample whose subject or aspect part matches `name`.
    ///
    /// Only defined for [`ObjectType::Sample`]. Scans the whole sample index,
    /// so cost grows with the number of live samples. The subject part must
    /// equal the key form of `name`; the aspect part is compared ignoring
    /// case. Returns the deleted keys.
    pub async fn delete_keys(
        &self,
        ty: ObjectType,
        parent: SampleParent,
        name: &str,
    ) -> CacheResult<Vec<String>> {
        let unsupported = CacheError::UnsupportedType {
            operation: "delete_keys",
            ty,
        };
        if ty != ObjectType::Sample {
            return Err(unsupported);
        }
        let index = self.indexes.index_for(ty).ok_or(unsupported)?;

        let subject_key_name = normalize_name(name);
        let aspect_name = name.to_lowercase();
        let selected: Vec<String> = self
            .store
            .smembers(&index)
            .await?
            .into_iter()
            .filter(|key| match self.codec.parse_sample_key(key) {
                Ok(sample) => match parent {
                    SampleParent::Subject => sample.subject == subject_key_name,
                    SampleParent::Aspect => sample.aspect.to_lowercase() == aspect_name,
                },
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping malformed sample index entry");
                    false
                }
            })
            .collect();
        debug!(%parent, name, selected = selected.len(), "scan delete selected samples");

        let mut batch = Batch::new();
        for key in &selected {
            batch
                .push(Command::srem(index.clone(), key.clone()))
                .push(Command::del(key.clone()));
        }
        self.executor.execute(batch).await?;
        Ok(selected)
    }

    /// All samples recorded for `aspect_name`, read in parallel.
    ///
    /// Order is not the relation set's order. A sample deleted since it was
    /// linked yields an empty map.
    pub async fn get_samples_from_aspect_name(&self, aspect_name: &str) -> CacheResult<Vec<Fields>> {
        let subjects = self
            .store
            .smembers(&self.mappings.aspect_key(aspect_name))
            .await?;
        let keys = subjects
            .iter()
            .map(|subject| self.codec.sample_key(subject, aspect_name))
            .collect();
        let hashes = read_hashes(
            Arc::clone(&self.store),
            keys,
            self.config.effective_fanout(),
        )
        .await?;
        Ok(hashes
            .into_iter()
            .map(|(key, hash)| self.hashes.decode(ObjectType::Sample, &key, hash))
            .collect())
    }

    /// Run caller-built commands as one atomic batch.
    pub async fn execute_batch(&self, commands: Vec<Command>) -> CacheResult<Vec<Reply>> {
        self.executor.execute(Batch::from(commands)).await
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use focus_store::{InMemoryKvStore, StoreResult};
    use serde_json::{json, Value};

    fn obj(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn facade() -> (Arc<InMemoryKvStore>, CacheFacade) {
        let store = Arc::new(InMemoryKvStore::new());
        let facade = CacheFacade::new(store.clone(), CacheConfig::default());
        (store, facade)
    }

    /// Write a subject, an aspect, the relation both ways and the sample.
    async fn seed_sample(f: &CacheFacade, subject: &str, aspect: &str, value: &str) {
        f.upsert(ObjectType::Subject, subject, obj(json!({"absolutePath": subject})))
            .await
            .unwrap();
        f.upsert(ObjectType::Aspect, aspect, obj(json!({"name": aspect})))
            .await
            .unwrap();
        f.link_sample(subject, aspect).await.unwrap();
        f.upsert(
            ObjectType::Sample,
            &format!("{subject}|{aspect}"),
            obj(json!({"value": value})),
        )
        .await
        .unwrap();
    }

    async fn sample_exists(f: &CacheFacade, subject: &str, aspect: &str) -> bool {
        let name = format!("{subject}|{aspect}");
        let indexed = f.exists_in_index(ObjectType::Sample, &name).await.unwrap();
        let stored = !f.read(ObjectType::Sample, &name).await.unwrap().is_empty();
        assert_eq!(indexed, stored, "index and hash disagree for {name}");
        indexed
    }

    /// Runs a one-shot batch right after the first read of a given set, to
    /// land a write between the two phases of a cascade.
    struct InterleavingStore {
        inner: Arc<InMemoryKvStore>,
        trigger_key: String,
        inject: Mutex<Option<Vec<Command>>>,
    }

    #[async_trait]
    impl KvStore for InterleavingStore {
        async fn execute(&self, command: Command) -> StoreResult<Reply> {
            let fire = matches!(&command, Command::SMembers { key } if *key == self.trigger_key);
            let reply = self.inner.execute(command).await;
            if fire {
                let pending = self.inject.lock().unwrap().take();
                if let Some(commands) = pending {
                    self.inner.execute_batch(commands).await?;
                }
            }
            reply
        }

        async fn execute_batch(&self, commands: Vec<Command>) -> StoreResult<Vec<Reply>> {
            self.inner.execute_batch(commands).await
        }
    }

    /// A facade whose store links room1|humidity right after the subject's
    /// relation set is first read.
    fn interleaved() -> (Arc<InMemoryKvStore>, CacheFacade) {
        let inner = Arc::new(InMemoryKvStore::new());
        let codec = KeyCodec::default();
        let mappings = MappingSet::new(codec.clone());
        let mut late = mappings.link("room1", "humidity").to_vec();
        late.push(Command::sadd("samsto:samples", codec.sample_key("room1", "humidity")));
        late.push(Command::hset(
            codec.sample_key("room1", "humidity"),
            [("value".to_string(), "40".to_string())].into(),
        ));
        let store = Arc::new(InterleavingStore {
            inner: inner.clone(),
            trigger_key: mappings.subject_key("room1"),
            inject: Mutex::new(Some(late)),
        });
        (inner, CacheFacade::new(store, CacheConfig::default()))
    }

    // -----------------------------------------------------------------------
    // Write / read / index
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upsert_then_read_and_exists() {
        let (_store, f) = facade();
        let value = obj(json!({"name": "Room1", "tags": ["a", "b"]}));
        f.upsert(ObjectType::Subject, "Room1", value.clone()).await.unwrap();

        assert_eq!(f.read(ObjectType::Subject, "room1").await.unwrap(), value);
        assert!(f.exists_in_index(ObjectType::Subject, "ROOM1").await.unwrap());
        assert_eq!(
            f.index_members(ObjectType::Subject).await.unwrap(),
            BTreeSet::from(["samsto:subject:room1".to_string()])
        );
    }

    #[tokio::test]
    async fn upsert_of_empty_value_creates_nothing() {
        let (store, f) = facade();
        f.upsert(ObjectType::Subject, "ghost", obj(json!({"x": null})))
            .await
            .unwrap();
        assert!(store.is_empty());
        assert!(!f.exists_in_index(ObjectType::Subject, "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn index_membership_ops() {
        let (_store, f) = facade();
        f.add_to_index(ObjectType::Aspect, "cpu").await.unwrap();
        assert!(f.exists_in_index(ObjectType::Aspect, "CPU").await.unwrap());
        f.remove_from_index(ObjectType::Aspect, "cpu").await.unwrap();
        assert!(!f.exists_in_index(ObjectType::Aspect, "cpu").await.unwrap());
    }

    #[tokio::test]
    async fn unindexed_types() {
        let (store, f) = facade();
        f.add_to_index(ObjectType::SubjectAspectMapping, "room1").await.unwrap();
        assert!(store.is_empty());
        let err = f
            .exists_in_index(ObjectType::AspectSubjectMapping, "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::UnsupportedType {
                operation: "exists_in_index",
                ty: ObjectType::AspectSubjectMapping
            }
        ));
    }

    // -----------------------------------------------------------------------
    // Relations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn link_and_unlink_both_directions() {
        let (store, f) = facade();
        f.link_sample("Room1", "Temperature").await.unwrap();
        assert!(f.is_linked("room1", "temperature").await.unwrap());

        // One side only is not a link.
        store
            .execute(f.mappings().remove_subject_from_aspect("temperature", "room1"))
            .await
            .unwrap();
        assert!(!f.is_linked("room1", "temperature").await.unwrap());

        f.unlink_sample("room1", "temperature").await.unwrap();
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // delete_key / rename_key
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_key_is_idempotent() {
        let (store, f) = facade();
        f.upsert(ObjectType::Aspect, "cpu", obj(json!({"name": "cpu"})))
            .await
            .unwrap();
        f.delete_key(ObjectType::Aspect, "cpu").await.unwrap();
        f.delete_key(ObjectType::Aspect, "cpu").await.unwrap();

        assert!(f.read(ObjectType::Aspect, "cpu").await.unwrap().is_empty());
        assert!(!f.exists_in_index(ObjectType::Aspect, "cpu").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn rename_moves_index_and_hash() {
        let (_store, f) = facade();
        let value = obj(json!({"name": "Room1", "tags": ["t"]}));
        f.upsert(ObjectType::Subject, "Room1", value.clone()).await.unwrap();

        f.rename_key(ObjectType::Subject, "Room1", "Room2").await.unwrap();

        assert!(!f.exists_in_index(ObjectType::Subject, "room1").await.unwrap());
        assert!(f.exists_in_index(ObjectType::Subject, "room2").await.unwrap());
        assert!(f.read(ObjectType::Subject, "room1").await.unwrap().is_empty());
        assert_eq!(f.read(ObjectType::Subject, "room2").await.unwrap(), value);
    }

    /// A valid name pair for `ty`; samples need the compound form.
    fn names_for(ty: ObjectType) -> (&'static str, &'static str) {
        match ty {
            ObjectType::Sample => ("Room1|CPU", "Room2|CPU"),
            _ => ("Room1", "Room2"),
        }
    }

    #[tokio::test]
    async fn delete_key_is_idempotent_for_every_type() {
        for ty in ObjectType::ALL {
            let (store, f) = facade();
            let (name, _) = names_for(ty);
            f.upsert(ty, name, obj(json!({"name": name}))).await.unwrap();
            assert!(!store.is_empty(), "{ty}");

            f.delete_key(ty, name).await.unwrap();
            f.delete_key(ty, name).await.unwrap();

            assert!(f.read(ty, name).await.unwrap().is_empty(), "{ty}");
            assert!(store.is_empty(), "{ty}: {:?}", store.keys());
        }
    }

    #[tokio::test]
    async fn rename_moves_hash_and_index_for_every_type() {
        let registry = IndexRegistry::default();
        for ty in ObjectType::ALL {
            let (store, f) = facade();
            let (old, new) = names_for(ty);
            let value = obj(json!({"name": old}));
            f.upsert(ty, old, value.clone()).await.unwrap();

            f.rename_key(ty, old, new).await.unwrap();

            assert!(f.read(ty, old).await.unwrap().is_empty(), "{ty}");
            assert_eq!(f.read(ty, new).await.unwrap(), value, "{ty}");

            let mut expected = vec![f.key(ty, new)];
            if let Some(index) = registry.index_for(ty) {
                assert_eq!(
                    f.index_members(ty).await.unwrap(),
                    BTreeSet::from([f.key(ty, new)]),
                    "{ty}"
                );
                expected.push(index);
            }
            expected.sort();
            assert_eq!(store.keys(), expected, "{ty}");
        }
    }

    #[tokio::test]
    async fn rename_of_missing_entity_changes_nothing() {
        let (store, f) = facade();
        f.add_to_index(ObjectType::Subject, "orphan").await.unwrap();
        let before = store.keys();

        let err = f
            .rename_key(ObjectType::Subject, "orphan", "other")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Store(StoreError::CommandFailed { index: 2, .. })
        ));
        assert_eq!(store.keys(), before);
        assert!(f.exists_in_index(ObjectType::Subject, "orphan").await.unwrap());
        assert!(!f.exists_in_index(ObjectType::Subject, "other").await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Relation cascades
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn subject_cascade_removes_all_its_samples() {
        let (_store, f) = facade();
        seed_sample(&f, "room1", "temperature", "72").await;
        seed_sample(&f, "room1", "humidity", "40").await;
        seed_sample(&f, "room2", "temperature", "68").await;

        let mut deleted = f
            .delete_sample_keys(ObjectType::SubjectAspectMapping, "Room1")
            .await
            .unwrap();
        deleted.sort_by_key(|s| s["value"].as_str().map(str::to_string));
        assert_eq!(
            deleted,
            vec![obj(json!({"value": "40"})), obj(json!({"value": "72"}))]
        );

        assert!(!sample_exists(&f, "room1", "temperature").await);
        assert!(!sample_exists(&f, "room1", "humidity").await);
        assert!(sample_exists(&f, "room2", "temperature").await);
        assert!(!f.is_linked("room1", "temperature").await.unwrap());
        assert!(!f.is_linked("room1", "humidity").await.unwrap());
        assert!(f.is_linked("room2", "temperature").await.unwrap());
    }

    #[tokio::test]
    async fn aspect_cascade_removes_samples_across_subjects() {
        let (_store, f) = facade();
        seed_sample(&f, "room1", "temperature", "72").await;
        seed_sample(&f, "room2", "temperature", "68").await;
        seed_sample(&f, "room2", "humidity", "30").await;

        let deleted = f
            .delete_sample_keys(ObjectType::AspectSubjectMapping, "TEMPERATURE")
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(!sample_exists(&f, "room1", "temperature").await);
        assert!(!sample_exists(&f, "room2", "temperature").await);
        assert!(sample_exists(&f, "room2", "humidity").await);
        assert!(f.is_linked("room2", "humidity").await.unwrap());
    }

    #[tokio::test]
    async fn cascade_skips_samples_already_gone() {
        let (_store, f) = facade();
        seed_sample(&f, "room1", "temperature", "72").await;
        f.link_sample("room1", "pressure").await.unwrap();

        let deleted = f
            .delete_sample_keys(ObjectType::SubjectAspectMapping, "room1")
            .await
            .unwrap();
        assert_eq!(deleted, vec![obj(json!({"value": "72"}))]);
        assert!(!f.is_linked("room1", "pressure").await.unwrap());
    }

    #[tokio::test]
    async fn cascade_on_unrelated_type_is_unsupported() {
        let (_store, f) = facade();
        let err = f
            .delete_sample_keys(ObjectType::Subject, "room1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::UnsupportedType {
                operation: "delete_sample_keys",
                ty: ObjectType::Subject
            }
        ));
    }

    #[tokio::test]
    async fn cascade_misses_sample_linked_between_phases() {
        let (inner, f) = interleaved();
        seed_sample(&f, "room1", "temperature", "72").await;

        let deleted = f
            .delete_sample_keys(ObjectType::SubjectAspectMapping, "room1")
            .await
            .unwrap();
        assert_eq!(deleted, vec![obj(json!({"value": "72"}))]);

        // The late sample survives the cascade, orphaned from its subject's
        // relation set. This is the accepted two-phase window.
        assert!(!sample_exists(&f, "room1", "temperature").await);
        assert!(sample_exists(&f, "room1", "humidity").await);
        assert!(inner
            .sismember("samsto:aspsubmap:humidity", "room1")
            .await
            .unwrap());
        assert!(inner
            .smembers("samsto:subaspmap:room1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn checked_cascade_rejects_interleaved_link() {
        let (_inner, f) = interleaved();
        seed_sample(&f, "room1", "temperature", "72").await;

        let err = f
            .delete_sample_keys_checked(ObjectType::SubjectAspectMapping, "room1")
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Conflict { ref key } if key == "samsto:subaspmap:room1"));

        // Nothing was deleted; a retry now sees both samples.
        assert!(sample_exists(&f, "room1", "temperature").await);
        assert!(sample_exists(&f, "room1", "humidity").await);
        let deleted = f
            .delete_sample_keys_checked(ObjectType::SubjectAspectMapping, "room1")
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(!sample_exists(&f, "room1", "humidity").await);
    }

    // -----------------------------------------------------------------------
    // Scan delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn scan_delete_by_aspect_hits_every_subject() {
        let (_store, f) = facade();
        seed_sample(&f, "subjectX", "aspectA", "1").await;
        seed_sample(&f, "subjectY", "aspectA", "2").await;
        seed_sample(&f, "subjectY", "aspectB", "3").await;

        let mut deleted = f
            .delete_keys(ObjectType::Sample, SampleParent::Aspect, "AspectA")
            .await
            .unwrap();
        deleted.sort();
        assert_eq!(
            deleted,
            vec![
                "samsto:sample:subjectx|aspecta".to_string(),
                "samsto:sample:subjecty|aspecta".to_string(),
            ]
        );
        assert!(!sample_exists(&f, "subjectX", "aspectA").await);
        assert!(!sample_exists(&f, "subjectY", "aspectA").await);
        assert!(sample_exists(&f, "subjectY", "aspectB").await);
    }

    #[tokio::test]
    async fn scan_delete_by_subject_is_selective() {
        let (_store, f) = facade();
        seed_sample(&f, "subjectX", "aspectA", "1").await;
        seed_sample(&f, "subjectY", "aspectA", "2").await;

        let deleted = f
            .delete_keys(ObjectType::Sample, SampleParent::Subject, "subjectX")
            .await
            .unwrap();
        assert_eq!(deleted, vec!["samsto:sample:subjectx|aspecta".to_string()]);
        assert!(!sample_exists(&f, "subjectX", "aspectA").await);
        assert!(sample_exists(&f, "subjectY", "aspectA").await);
    }

    #[tokio::test]
    async fn scan_delete_rejects_non_sample_types() {
        let (store, f) = facade();
        seed_sample(&f, "foo", "aspectA", "1").await;
        let before = store.keys();

        let err = f
            .delete_keys(ObjectType::Subject, SampleParent::Subject, "foo")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::UnsupportedType {
                operation: "delete_keys",
                ty: ObjectType::Subject
            }
        ));
        assert_eq!(store.keys(), before);
    }

    #[tokio::test]
    async fn scan_delete_skips_malformed_index_entries() {
        let (store, f) = facade();
        seed_sample(&f, "room1", "cpu", "1").await;
        store.sadd("samsto:samples", "junk").await.unwrap();

        let deleted = f
            .delete_keys(ObjectType::Sample, SampleParent::Aspect, "cpu")
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(store.sismember("samsto:samples", "junk").await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Fan-out read
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn samples_for_aspect_room1_temperature() {
        let (_store, f) = facade();
        f.upsert(ObjectType::Subject, "room1", obj(json!({"name": "room1"})))
            .await
            .unwrap();
        f.upsert(ObjectType::Aspect, "temperature", obj(json!({"name": "temperature"})))
            .await
            .unwrap();
        f.link_sample("room1", "temperature").await.unwrap();
        f.write(ObjectType::Sample, "room1|temperature", obj(json!({"value": "72"})))
            .await
            .unwrap();

        let samples = f.get_samples_from_aspect_name("temperature").await.unwrap();
        assert_eq!(samples, vec![obj(json!({"value": "72"}))]);
    }

    #[tokio::test]
    async fn samples_for_aspect_include_empty_for_missing() {
        let (_store, f) = facade();
        seed_sample(&f, "room1", "temperature", "72").await;
        f.link_sample("room2", "temperature").await.unwrap();

        let samples = f.get_samples_from_aspect_name("Temperature").await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples.iter().filter(|s| s.is_empty()).count(), 1);
    }

    // -----------------------------------------------------------------------
    // Batches and failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn execute_batch_returns_positional_replies() {
        let (_store, f) = facade();
        let replies = f
            .execute_batch(vec![
                Command::sadd("s", "a"),
                Command::sismember("s", "a"),
                Command::sismember("s", "b"),
            ])
            .await
            .unwrap();
        assert_eq!(
            replies,
            vec![Reply::Integer(1), Reply::Bool(true), Reply::Bool(false)]
        );
    }

    #[tokio::test]
    async fn store_failure_propagates_unchanged() {
        let (store, f) = facade();
        store.set_offline(true);
        let err = f.delete_key(ObjectType::Subject, "x").await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn custom_namespace_flows_through_keys() {
        let store = Arc::new(InMemoryKvStore::new());
        let config = CacheConfig {
            namespace: "t".into(),
            ..CacheConfig::default()
        };
        let f = CacheFacade::new(store.clone(), config);
        f.upsert(ObjectType::Aspect, "cpu", obj(json!({"name": "cpu"})))
            .await
            .unwrap();
        assert_eq!(
            store.keys(),
            vec!["t:aspect:cpu".to_string(), "t:aspects".to_string()]
        );
    }
}
