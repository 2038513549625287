use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Separator between the subject path and the aspect name in a sample name.
pub const SAMPLE_NAME_SEPARATOR: char = '|';

/// A sample's compound name: `subjectAbsolutePath|aspectName`.
///
/// Subject paths use `.` between segments and never contain the separator,
/// so the name is split at the first `|`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SampleName {
    pub subject: String,
    pub aspect: String,
}

impl SampleName {
    pub fn new(subject: impl Into<String>, aspect: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            aspect: aspect.into(),
        }
    }

    /// Split a compound name into its parts.
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        match name.split_once(SAMPLE_NAME_SEPARATOR) {
            Some((subject, aspect)) if !subject.is_empty() && !aspect.is_empty() => {
                Ok(Self::new(subject, aspect))
            }
            _ => Err(TypeError::InvalidSampleName {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.subject, SAMPLE_NAME_SEPARATOR, self.aspect)
    }
}

impl FromStr for SampleName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Which half of a sample name a cascade matches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleParent {
    Subject,
    Aspect,
}

impl FromStr for SampleParent {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(Self::Subject),
            "aspect" => Ok(Self::Aspect),
            other => Err(TypeError::UnknownObjectType(other.to_string())),
        }
    }
}

impl fmt::Display for SampleParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Subject => "subject",
            Self::Aspect => "aspect",
        })
    }
}
