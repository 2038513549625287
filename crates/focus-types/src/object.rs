use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kinds of entity held in the cache.
///
/// The set is closed: behavior that varies by type (key token, master index,
/// field tables) is selected by matching on this enum, so an unknown type is
/// rejected when it is parsed rather than when it is first used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Subject,
    Aspect,
    Sample,
    /// Set of aspect names sampled by one subject.
    SubjectAspectMapping,
    /// Set of subject names sampled for one aspect.
    AspectSubjectMapping,
}

impl ObjectType {
    /// Every variant, in declaration order.
    pub const ALL: [ObjectType; 5] = [
        ObjectType::Subject,
        ObjectType::Aspect,
        ObjectType::Sample,
        ObjectType::SubjectAspectMapping,
        ObjectType::AspectSubjectMapping,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Aspect => "aspect",
            Self::Sample => "sample",
            Self::SubjectAspectMapping => "subjectAspectMapping",
            Self::AspectSubjectMapping => "aspectSubjectMapping",
        }
    }

    /// Short token used inside store keys.
    pub fn key_token(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Aspect => "aspect",
            Self::Sample => "sample",
            Self::SubjectAspectMapping => "subaspmap",
            Self::AspectSubjectMapping => "aspsubmap",
        }
    }

    /// Inverse of [`key_token`](Self::key_token).
    pub fn from_key_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key_token() == token)
    }

    /// Returns `true` for the two relation-set types.
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            Self::SubjectAspectMapping | Self::AspectSubjectMapping
        )
    }

    /// The mapping type running the other way, for relation types.
    pub fn reverse_mapping(&self) -> Option<Self> {
        match self {
            Self::SubjectAspectMapping => Some(Self::AspectSubjectMapping),
            Self::AspectSubjectMapping => Some(Self::SubjectAspectMapping),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypeError::UnknownObjectType(s.to_string()))
    }
}
