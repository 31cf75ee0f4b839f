//! Backing store contract.
//!
//! The index only needs a handful of set primitives and the ability to run
//! an ordered batch of them atomically. Any engine that provides that can
//! sit behind [`SetStore`].

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Commands and replies
// ============================================================================

/// One primitive set operation addressable within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Insert `member` into the set at `key`, creating it if absent.
    SetAdd { key: String, member: String },
    /// Remove `member` from the set at `key`. Absent members are a no-op.
    SetRemove { key: String, member: String },
    /// List the members of the set at `key`. A missing key is an empty set.
    SetMembers { key: String },
    /// Intersect the sets at `keys`.
    SetIntersect { keys: Vec<String> },
    /// Delete `key` entirely.
    Delete { key: String },
}

impl Command {
    pub fn set_add(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SetAdd {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn set_remove(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SetRemove {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn set_members(key: impl Into<String>) -> Self {
        Self::SetMembers { key: key.into() }
    }

    pub fn set_intersect(keys: Vec<String>) -> Self {
        Self::SetIntersect { keys }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetAdd { .. } => "SADD",
            Self::SetRemove { .. } => "SREM",
            Self::SetMembers { .. } => "SMEMBERS",
            Self::SetIntersect { .. } => "SINTER",
            Self::Delete { .. } => "DEL",
        }
    }
}

/// Result of one command, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Number of members added/removed, or keys deleted.
    Count(i64),
    /// Members of a listing or intersection. Order is unspecified.
    Members(Vec<String>),
}

impl Reply {
    pub fn into_members(self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Members(members) => Ok(members),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected members, got {other:?}"
            ))),
        }
    }
}

/// Precondition checked atomically before a batch applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The set at `key` must hold exactly `members` (order-insensitive).
    SetUnchanged { key: String, members: Vec<String> },
}

/// An ordered group of commands executed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub guard: Option<Guard>,
    pub commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(command: Command) -> Self {
        Self {
            guard: None,
            commands: vec![command],
        }
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the connection failed mid-batch.
    /// Whether any command applied is unknown.
    #[error("store transport error: {0}")]
    Transport(String),
    /// A batch guard did not hold; nothing was applied.
    #[error("batch guard failed on key {key}")]
    Conflict { key: String },
    /// The store rejected a command (wrong key type, bad arguments).
    #[error("store rejected command: {0}")]
    Rejected(String),
    /// The store answered with something the adapter could not decode.
    #[error("unexpected store reply: {0}")]
    UnexpectedReply(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Conflict { .. })
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// A set-oriented key-value store with atomic batch execution.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Execute every command in `batch` as one atomic unit.
    ///
    /// On success returns exactly one [`Reply`] per command, in submission
    /// order. If a guard is present and does not hold, returns
    /// [`StoreError::Conflict`] without applying anything.
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_accessors_check_shape() {
        assert!(Reply::Count(2).into_members().is_err());
        assert_eq!(
            Reply::Members(vec!["a".into()]).into_members().unwrap(),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn only_transport_and_conflict_are_retryable() {
        assert!(StoreError::Transport("reset".into()).is_retryable());
        assert!(StoreError::Conflict { key: "k".into() }.is_retryable());
        assert!(!StoreError::Rejected("WRONGTYPE".into()).is_retryable());
    }

    #[test]
    fn batch_builder_keeps_order() {
        let mut batch = Batch::new();
        batch
            .push(Command::set_add("k", "a"))
            .push(Command::delete("k"));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.commands[0].name(), "SADD");
        assert_eq!(batch.commands[1].name(), "DEL");
        assert!(batch.guard.is_none());
    }
}
