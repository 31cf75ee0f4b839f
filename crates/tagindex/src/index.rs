//! Namespace-scoped mutation of the tag relation.
//!
//! Every tag assignment is stored twice: the object id goes into the tag's
//! membership set and the tag goes into the object's membership set. Each
//! mutation writes both directions in one atomic batch, so an object
//! appears under a tag exactly when the tag appears under the object.

use crate::config::{IndexConfig, RemovalPolicy};
use crate::error::{Result, TagIndexError};
use crate::id::ObjectId;
use crate::keys::KeySpace;
use crate::query::{ObjectPairQuery, ObjectQuery, Query, TagQuery};
use crate::store::{Batch, Command, Guard, Reply, SetStore, StoreError};
use crate::tags::{Tag, TagList};
use std::fmt;
use std::sync::Arc;

pub struct TagIndex {
    keys: KeySpace,
    store: Arc<dyn SetStore>,
    removal: RemovalPolicy,
}

impl fmt::Debug for TagIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagIndex")
            .field("namespace", &self.keys.namespace())
            .field("removal", &self.removal)
            .finish_non_exhaustive()
    }
}

impl TagIndex {
    /// Create an index over `namespace` with the default configuration.
    pub fn new(store: Arc<dyn SetStore>, namespace: impl Into<String>) -> Result<Self> {
        Self::with_config(store, IndexConfig::new(namespace))
    }

    pub fn with_config(store: Arc<dyn SetStore>, config: IndexConfig) -> Result<Self> {
        Ok(Self {
            keys: KeySpace::new(config.namespace)?,
            store,
            removal: config.removal,
        })
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub(crate) async fn run(&self, batch: Batch) -> Result<Vec<Reply>> {
        tracing::debug!(
            namespace = %self.keys.namespace(),
            commands = batch.len(),
            guarded = batch.guard.is_some(),
            "executing batch"
        );
        let replies = self.store.execute(batch).await?;
        tracing::trace!(replies = replies.len(), "batch complete");
        Ok(replies)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Assign every tag in `tags` to `id`.
    ///
    /// `tags` is either a comma-delimited string or a sequence of labels.
    pub async fn add<T>(&self, tags: T, id: impl Into<ObjectId>) -> Result<()>
    where
        T: TryInto<TagList>,
        TagIndexError: From<T::Error>,
    {
        let tags: TagList = tags.try_into()?;
        let id = id.into();
        id.validate()?;

        let member = id.to_string();
        let object_key = self.keys.object_key(&id);
        let mut batch = Batch::new();
        for tag in &tags {
            batch
                .push(Command::set_add(self.keys.tag_key(tag), member.as_str()))
                .push(Command::set_add(object_key.as_str(), tag.as_str()));
        }
        self.run(batch).await?;
        Ok(())
    }

    /// Unassign every tag in `tags` from `id`. Tags that were not assigned
    /// are ignored.
    pub async fn remove_tags<T>(&self, tags: T, id: impl Into<ObjectId>) -> Result<()>
    where
        T: TryInto<TagList>,
        TagIndexError: From<T::Error>,
    {
        let tags: TagList = tags.try_into()?;
        let id = id.into();
        id.validate()?;

        let member = id.to_string();
        let object_key = self.keys.object_key(&id);
        let mut batch = Batch::new();
        for tag in &tags {
            batch
                .push(Command::set_remove(self.keys.tag_key(tag), member.as_str()))
                .push(Command::set_remove(object_key.as_str(), tag.as_str()));
        }
        self.run(batch).await?;
        Ok(())
    }

    /// Remove `id` from the index entirely, returning the tags it carried.
    ///
    /// Runs in two phases: list the object's tags, then delete the object's
    /// set and detach it from each of those tags in one batch. Under
    /// [`RemovalPolicy::Guarded`] the second phase only applies if the tag
    /// set is unchanged since the first; otherwise both phases are retried
    /// and, once attempts run out, [`TagIndexError::StaleRead`] is returned.
    pub async fn remove_object(&self, id: impl Into<ObjectId>) -> Result<Vec<Tag>> {
        let id = id.into();
        id.validate()?;

        let (guarded, attempts) = match self.removal {
            RemovalPolicy::Unguarded => (false, 1),
            RemovalPolicy::Guarded { max_attempts } => (true, max_attempts.max(1)),
        };

        let member = id.to_string();
        let object_key = self.keys.object_key(&id);
        for attempt in 1..=attempts {
            let tags = ObjectQuery::new(self, id.clone()).execute().await?;

            let mut batch = Batch::single(Command::delete(object_key.as_str()));
            for tag in &tags {
                batch.push(Command::set_remove(self.keys.tag_key(tag), member.as_str()));
            }
            if guarded {
                batch = batch.guarded(Guard::SetUnchanged {
                    key: object_key.clone(),
                    members: tags.iter().map(|t| t.as_str().to_string()).collect(),
                });
            }

            match self.run(batch).await {
                Ok(_) => return Ok(tags),
                Err(TagIndexError::Store(StoreError::Conflict { .. })) if guarded => {
                    tracing::warn!(
                        namespace = %self.keys.namespace(),
                        object = %id,
                        attempt,
                        "object tags changed during removal"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(TagIndexError::StaleRead {
            object: member,
            attempts,
        })
    }

    // ========================================================================
    // Query builders
    // ========================================================================

    /// Tags carried by `id`. Nothing is read until the query is executed.
    pub fn query_by_object(&self, id: impl Into<ObjectId>) -> Result<ObjectQuery<'_>> {
        let id = id.into();
        id.validate()?;
        Ok(ObjectQuery::new(self, id))
    }

    /// Tags carried by both `first` and `second`.
    pub fn query_by_objects(
        &self,
        first: impl Into<ObjectId>,
        second: impl Into<ObjectId>,
    ) -> Result<ObjectPairQuery<'_>> {
        let first = first.into();
        let second = second.into();
        first.validate()?;
        second.validate()?;
        Ok(ObjectPairQuery::new(self, first, second))
    }

    /// Objects carrying every tag in `tags`.
    pub fn query_by_tags<T>(&self, tags: T) -> Result<TagQuery<'_>>
    where
        T: TryInto<TagList>,
        TagIndexError: From<T::Error>,
    {
        Ok(TagQuery::new(self, tags.try_into()?))
    }
}
