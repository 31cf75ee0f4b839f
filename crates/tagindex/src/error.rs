//! Error types for the tag index.

use crate::store::StoreError;
use std::convert::Infallible;

/// Errors surfaced by [`crate::TagIndex`] and the query family.
#[derive(Debug, thiserror::Error)]
pub enum TagIndexError {
    /// An index was constructed without a namespace.
    #[error("a tag index requires a non-empty namespace key")]
    EmptyNamespace,

    /// The tag list was empty or contained an empty label.
    #[error("invalid tag list {input:?}: {reason}")]
    InvalidTagList { input: String, reason: &'static str },

    /// The object id was empty.
    #[error("invalid object id {0:?}")]
    InvalidObjectId(String),

    /// The object's tag set changed between the read and the delete of
    /// `remove_object`, on every attempt.
    #[error("tag set of object {object} changed during removal ({attempts} attempts)")]
    StaleRead { object: String, attempts: u32 },

    /// Passed through unchanged from the backing store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TagIndexError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StaleRead { .. } => true,
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<Infallible> for TagIndexError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, TagIndexError>;
