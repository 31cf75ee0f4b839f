//! Store key naming.
//!
//! ```text
//! <namespace>:tag:<tag>       set of object ids carrying <tag>
//! <namespace>:object:<id>     set of tags carried by <id>
//! ```
//!
//! Existing data depends on this layout, so it must not change.

use crate::error::TagIndexError;
use crate::id::ObjectId;
use crate::tags::Tag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Result<Self, TagIndexError> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(TagIndexError::EmptyNamespace);
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn tag_key(&self, tag: &Tag) -> String {
        format!("{}:tag:{}", self.namespace, tag)
    }

    pub fn object_key(&self, id: &ObjectId) -> String {
        format!("{}:object:{}", self.namespace, id)
    }
}
