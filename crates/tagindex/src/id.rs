//! Object identifiers.
//!
//! Ids may be numbers or strings. Both serialize to the same canonical text
//! when stored, so `1` and `"1"` name the same object: text that reads as a
//! canonical base-10 `i64` is normalised to [`ObjectId::Numeric`] on the way
//! in.

use crate::error::TagIndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged, from = "RawObjectId")]
pub enum ObjectId {
    Numeric(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawObjectId {
    Numeric(i64),
    Text(String),
}

impl From<RawObjectId> for ObjectId {
    fn from(raw: RawObjectId) -> Self {
        match raw {
            RawObjectId::Numeric(n) => Self::Numeric(n),
            RawObjectId::Text(s) => Self::from(s),
        }
    }
}

impl ObjectId {
    /// Decode a member string read back from a tag-membership set.
    pub fn from_member(member: String) -> Self {
        Self::from(member)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    pub(crate) fn validate(&self) -> Result<(), TagIndexError> {
        if self.is_empty() {
            return Err(TagIndexError::InvalidObjectId(String::new()));
        }
        Ok(())
    }
}

/// `"42"` and `"-7"` are canonical; `"007"`, `"+1"` and `"-0"` are not.
fn canonical_integer(s: &str) -> Option<i64> {
    let n: i64 = s.parse().ok()?;
    (n.to_string() == s).then_some(n)
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ObjectId {
    type Err = TagIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TagIndexError::InvalidObjectId(s.to_string()));
        }
        Ok(Self::from(s))
    }
}

impl From<i64> for ObjectId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<i32> for ObjectId {
    fn from(n: i32) -> Self {
        Self::Numeric(n.into())
    }
}

impl From<u32> for ObjectId {
    fn from(n: u32) -> Self {
        Self::Numeric(n.into())
    }
}

// Values past `i64::MAX` keep their decimal text, the same id `From<&str>`
// gives for that string.
impl From<u64> for ObjectId {
    fn from(n: u64) -> Self {
        i64::try_from(n)
            .map(Self::Numeric)
            .unwrap_or_else(|_| Self::Text(n.to_string()))
    }
}

impl From<usize> for ObjectId {
    fn from(n: usize) -> Self {
        i64::try_from(n)
            .map(Self::Numeric)
            .unwrap_or_else(|_| Self::Text(n.to_string()))
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        match canonical_integer(s) {
            Some(n) => Self::Numeric(n),
            None => Self::Text(s.to_string()),
        }
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        match canonical_integer(&s) {
            Some(n) => Self::Numeric(n),
            None => Self::Text(s),
        }
    }
}

impl From<&ObjectId> for ObjectId {
    fn from(id: &ObjectId) -> Self {
        id.clone()
    }
}
