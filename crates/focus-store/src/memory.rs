use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::command::{Command, HashFields, Reply};
use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// A value held at one key.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    Hash(HashFields),
    Set(BTreeSet<String>),
    Str(String),
}

type Keyspace = HashMap<String, Entry>;

/// In-memory, HashMap-based key/value store.
///
/// Intended for tests and embedding. The keyspace sits behind a single
/// `RwLock`; a batch holds the write lock for its whole run and keeps an undo
/// log of every key it touches, so a failing command restores the keyspace
/// to its pre-batch state before the error is returned.
pub struct InMemoryKvStore {
    keyspace: RwLock<Keyspace>,
    offline: AtomicBool,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            keyspace: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of keys currently stored.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the keyspace lock.
    pub fn len(&self) -> usize {
        self.keyspace.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all keys.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the keyspace lock.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keyspace
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Simulate losing the connection: every command fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

fn hash_mut<'a>(ks: &'a mut Keyspace, key: &str) -> StoreResult<&'a mut HashFields> {
    match ks
        .entry(key.to_string())
        .or_insert_with(|| Entry::Hash(BTreeMap::new()))
    {
        Entry::Hash(h) => Ok(h),
        _ => Err(wrong_type(key, "hash")),
    }
}

fn set_mut<'a>(ks: &'a mut Keyspace, key: &str) -> StoreResult<&'a mut BTreeSet<String>> {
    match ks
        .entry(key.to_string())
        .or_insert_with(|| Entry::Set(BTreeSet::new()))
    {
        Entry::Set(s) => Ok(s),
        _ => Err(wrong_type(key, "set")),
    }
}

fn read_set(ks: &Keyspace, key: &str) -> StoreResult<BTreeSet<String>> {
    match ks.get(key) {
        None => Ok(BTreeSet::new()),
        Some(Entry::Set(s)) => Ok(s.clone()),
        Some(_) => Err(wrong_type(key, "set")),
    }
}

/// Drop a hash or set that a command left empty.
fn prune_empty(ks: &mut Keyspace, key: &str) {
    let empty = match ks.get(key) {
        Some(Entry::Hash(h)) => h.is_empty(),
        Some(Entry::Set(s)) => s.is_empty(),
        _ => false,
    };
    if empty {
        ks.remove(key);
    }
}

/// Apply one command to the keyspace. A failing command changes nothing.
fn apply(ks: &mut Keyspace, command: &Command) -> StoreResult<Reply> {
    match command {
        Command::HGetAll { key } => match ks.get(key) {
            None => Ok(Reply::Hash(BTreeMap::new())),
            Some(Entry::Hash(h)) => Ok(Reply::Hash(h.clone())),
            Some(_) => Err(wrong_type(key, "hash")),
        },
        Command::HSet { key, fields } => {
            if fields.is_empty() {
                return Err(StoreError::InvalidArgument(format!(
                    "HSET {key} with no fields"
                )));
            }
            let hash = hash_mut(ks, key)?;
            let mut added = 0;
            for (field, value) in fields {
                if hash.insert(field.clone(), value.clone()).is_none() {
                    added += 1;
                }
            }
            Ok(Reply::Integer(added))
        }
        Command::HDel { key, field } => {
            let removed = match ks.get_mut(key) {
                None => false,
                Some(Entry::Hash(h)) => h.remove(field).is_some(),
                Some(_) => return Err(wrong_type(key, "hash")),
            };
            prune_empty(ks, key);
            Ok(Reply::Integer(i64::from(removed)))
        }
        Command::SAdd { key, member } => {
            let added = set_mut(ks, key)?.insert(member.clone());
            Ok(Reply::Integer(i64::from(added)))
        }
        Command::SRem { key, member } => {
            let removed = match ks.get_mut(key) {
                None => false,
                Some(Entry::Set(s)) => s.remove(member),
                Some(_) => return Err(wrong_type(key, "set")),
            };
            prune_empty(ks, key);
            Ok(Reply::Integer(i64::from(removed)))
        }
        Command::SMembers { key } => read_set(ks, key).map(Reply::Members),
        Command::SIsMember { key, member } => {
            read_set(ks, key).map(|s| Reply::Bool(s.contains(member)))
        }
        Command::Rename { from, to } => {
            let value = ks
                .remove(from)
                .ok_or_else(|| StoreError::NoSuchKey(from.clone()))?;
            ks.insert(to.clone(), value);
            Ok(Reply::Ok)
        }
        Command::Del { key } => Ok(Reply::Integer(i64::from(ks.remove(key).is_some()))),
        Command::Get { key } => match ks.get(key) {
            None => Ok(Reply::Value(None)),
            Some(Entry::Str(s)) => Ok(Reply::Value(Some(s.clone()))),
            Some(_) => Err(wrong_type(key, "string")),
        },
        Command::Set { key, value } => {
            ks.insert(key.clone(), Entry::Str(value.clone()));
            Ok(Reply::Ok)
        }
        Command::ExpectMembers { key, members } => {
            if &read_set(ks, key)? == members {
                Ok(Reply::Ok)
            } else {
                Err(StoreError::GuardFailed { key: key.clone() })
            }
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn execute(&self, command: Command) -> StoreResult<Reply> {
        self.check_online()?;
        let mut ks = self.keyspace.write().map_err(poisoned)?;
        apply(&mut ks, &command)
    }

    async fn execute_batch(&self, commands: Vec<Command>) -> StoreResult<Vec<Reply>> {
        self.check_online()?;
        let mut ks = self.keyspace.write().map_err(poisoned)?;

        // Prior value of every key the batch has written so far.
        let mut undo: Vec<(String, Option<Entry>)> = Vec::new();
        let mut replies = Vec::with_capacity(commands.len());

        for (index, command) in commands.iter().enumerate() {
            for key in command.written_keys() {
                if !undo.iter().any(|(k, _)| k == key) {
                    undo.push((key.to_string(), ks.get(key).cloned()));
                }
            }
            match apply(&mut ks, command) {
                Ok(reply) => replies.push(reply),
                Err(source) => {
                    for (key, prior) in undo.into_iter().rev() {
                        match prior {
                            Some(entry) => ks.insert(key, entry),
                            None => ks.remove(&key),
                        };
                    }
                    debug!(index, command = command.name(), error = %source, "batch rolled back");
                    return Err(StoreError::CommandFailed {
                        index,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(replies)
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}
