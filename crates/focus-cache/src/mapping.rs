//! Relation set primitives.
//!
//! Two families of sets record which subject/aspect pairs have a sample:
//! `aspsubmap:<aspect>` holds subject names and `subaspmap:<subject>` holds
//! aspect names. Each primitive here is a single-set [`Command`] that is not
//! executed; callers fold it into a batch with whatever else must change in
//! the same unit. The single primitives do not keep the two directions in
//! step. [`MappingSet::link`] and [`MappingSet::unlink`] return both sides
//! together, and the cache facade only exposes those.

use focus_store::Command;
use focus_types::{normalize_name, KeyCodec, ObjectType};

#[derive(Clone, Debug, Default)]
pub struct MappingSet {
    codec: KeyCodec,
}

impl MappingSet {
    pub fn new(codec: KeyCodec) -> Self {
        Self { codec }
    }

    /// Key of the subject set for `aspect`.
    pub fn aspect_key(&self, aspect: &str) -> String {
        self.codec.key(ObjectType::AspectSubjectMapping, aspect)
    }

    /// Key of the aspect set for `subject`.
    pub fn subject_key(&self, subject: &str) -> String {
        self.codec.key(ObjectType::SubjectAspectMapping, subject)
    }

    pub fn add_subject_to_aspect(&self, aspect: &str, subject: &str) -> Command {
        Command::sadd(self.aspect_key(aspect), normalize_name(subject))
    }

    pub fn remove_subject_from_aspect(&self, aspect: &str, subject: &str) -> Command {
        Command::srem(self.aspect_key(aspect), normalize_name(subject))
    }

    pub fn add_aspect_to_subject(&self, subject: &str, aspect: &str) -> Command {
        Command::sadd(self.subject_key(subject), normalize_name(aspect))
    }

    pub fn remove_aspect_from_subject(&self, subject: &str, aspect: &str) -> Command {
        Command::srem(self.subject_key(subject), normalize_name(aspect))
    }

    pub fn subject_in_aspect(&self, aspect: &str, subject: &str) -> Command {
        Command::sismember(self.aspect_key(aspect), normalize_name(subject))
    }

    pub fn aspect_in_subject(&self, subject: &str, aspect: &str) -> Command {
        Command::sismember(self.subject_key(subject), normalize_name(aspect))
    }

    /// Both directions of a new subject/aspect relation.
    pub fn link(&self, subject: &str, aspect: &str) -> [Command; 2] {
        [
            self.add_subject_to_aspect(aspect, subject),
            self.add_aspect_to_subject(subject, aspect),
        ]
    }

    /// Both directions of a removed subject/aspect relation.
    pub fn unlink(&self, subject: &str, aspect: &str) -> [Command; 2] {
        [
            self.remove_subject_from_aspect(aspect, subject),
            self.remove_aspect_from_subject(subject, aspect),
        ]
    }
}
