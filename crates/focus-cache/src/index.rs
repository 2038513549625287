//! Master index membership commands.
//!
//! Each indexed type has one set holding the keys of all its live entities.
//! Membership in that set is the only test of existence. Types with no
//! master index produce no command.

use focus_store::Command;
use focus_types::{IndexRegistry, KeyCodec, ObjectType};

#[derive(Clone, Debug, Default)]
pub struct IndexOps {
    codec: KeyCodec,
    registry: IndexRegistry,
}

impl IndexOps {
    pub fn new(codec: KeyCodec, registry: IndexRegistry) -> Self {
        Self { codec, registry }
    }

    pub fn index_for(&self, ty: ObjectType) -> Option<String> {
        self.registry.index_for(ty)
    }

    pub fn add(&self, ty: ObjectType, name: &str) -> Option<Command> {
        self.add_key(ty, self.codec.key(ty, name))
    }

    pub fn remove(&self, ty: ObjectType, name: &str) -> Option<Command> {
        self.remove_key(ty, self.codec.key(ty, name))
    }

    pub fn contains(&self, ty: ObjectType, name: &str) -> Option<Command> {
        let index = self.registry.index_for(ty)?;
        Some(Command::sismember(index, self.codec.key(ty, name)))
    }

    /// Add an already-built key.
    pub fn add_key(&self, ty: ObjectType, key: impl Into<String>) -> Option<Command> {
        let index = self.registry.index_for(ty)?;
        Some(Command::sadd(index, key))
    }

    /// Remove an already-built key.
    pub fn remove_key(&self, ty: ObjectType, key: impl Into<String>) -> Option<Command> {
        let index = self.registry.index_for(ty)?;
        Some(Command::srem(index, key))
    }
}
