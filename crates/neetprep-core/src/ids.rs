//! Opaque identifiers for the content hierarchy.
//!
//! The backing store hands out ids as either strings or numbers, so every id
//! is kept as its textual form. Ids are compared, hashed and ordered as
//! strings; ordering only matters for deterministic breakdown output.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new id from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
    };
}

/// Wire form of an id: JSON backends send numbers, TOML banks usually strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s.trim().to_string(),
            RawId::Int(n) => n.to_string(),
        }
    }
}

opaque_id!(
    /// Identifier of a single question.
    QuestionId
);
opaque_id!(
    /// Identifier of a syllabus portion (e.g. "Class 11").
    PortionId
);
opaque_id!(
    /// Identifier of a subject within a portion.
    SubjectId
);
opaque_id!(
    /// Identifier of a chapter within a subject.
    ChapterId
);
opaque_id!(
    /// Identifier of a topic within a chapter.
    TopicId
);
opaque_id!(
    /// Identifier of a question type (e.g. assertion-reason, single correct).
    QuestionTypeId
);
