//! Index configuration.

use serde::{Deserialize, Serialize};

/// How `remove_object` handles tag sets that change between its read and
/// its delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Read then delete with no check. A tag added concurrently is left
    /// behind in its tag-membership set.
    Unguarded,
    /// Delete only if the object's tag set still matches what was read,
    /// re-reading up to `max_attempts` times.
    Guarded { max_attempts: u32 },
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self::Guarded { max_attempts: 3 }
    }
}

/// Configuration for one [`crate::TagIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Key prefix isolating this tag universe.
    pub namespace: String,
    #[serde(default)]
    pub removal: RemovalPolicy,
}

impl IndexConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            removal: RemovalPolicy::default(),
        }
    }

    pub fn with_removal(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }
}
