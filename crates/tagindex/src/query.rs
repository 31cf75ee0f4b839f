//! Lazily executed queries.
//!
//! Building a query only records its parameters. [`Query::execute`] sends a
//! single-command batch to the store and decodes the reply; executing again
//! re-issues the batch.

use crate::error::Result;
use crate::id::ObjectId;
use crate::index::TagIndex;
use crate::store::{Batch, Command};
use crate::tags::{Tag, TagList};
use async_trait::async_trait;

#[async_trait]
pub trait Query: Send + Sync {
    type Item: Send;

    /// The command this query will run.
    fn command(&self) -> Command;

    async fn execute(&self) -> Result<Vec<Self::Item>>;
}

async fn members(index: &TagIndex, command: Command) -> Result<Vec<String>> {
    let reply = index
        .run(Batch::single(command))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            crate::store::StoreError::UnexpectedReply("empty reply to a query batch".to_string())
        })?;
    Ok(reply.into_members()?)
}

/// Tags carried by one object.
#[derive(Debug, Clone)]
pub struct ObjectQuery<'a> {
    index: &'a TagIndex,
    id: ObjectId,
}

impl<'a> ObjectQuery<'a> {
    pub(crate) fn new(index: &'a TagIndex, id: ObjectId) -> Self {
        Self { index, id }
    }
}

#[async_trait]
impl<'a> Query for ObjectQuery<'a> {
    type Item = Tag;

    fn command(&self) -> Command {
        Command::set_members(self.index.keys().object_key(&self.id))
    }

    async fn execute(&self) -> Result<Vec<Tag>> {
        let tags = members(self.index, self.command()).await?;
        Ok(tags.into_iter().map(Tag::from).collect())
    }
}

/// Tags carried by both of two objects.
#[derive(Debug, Clone)]
pub struct ObjectPairQuery<'a> {
    index: &'a TagIndex,
    first: ObjectId,
    second: ObjectId,
}

impl<'a> ObjectPairQuery<'a> {
    pub(crate) fn new(index: &'a TagIndex, first: ObjectId, second: ObjectId) -> Self {
        Self {
            index,
            first,
            second,
        }
    }
}

#[async_trait]
impl<'a> Query for ObjectPairQuery<'a> {
    type Item = Tag;

    fn command(&self) -> Command {
        let keys = self.index.keys();
        Command::set_intersect(vec![
            keys.object_key(&self.first),
            keys.object_key(&self.second),
        ])
    }

    async fn execute(&self) -> Result<Vec<Tag>> {
        let tags = members(self.index, self.command()).await?;
        Ok(tags.into_iter().map(Tag::from).collect())
    }
}

/// Objects carrying every tag in a list. A single tag reads that tag's
/// whole membership set.
#[derive(Debug, Clone)]
pub struct TagQuery<'a> {
    index: &'a TagIndex,
    tags: TagList,
}

impl<'a> TagQuery<'a> {
    pub(crate) fn new(index: &'a TagIndex, tags: TagList) -> Self {
        Self { index, tags }
    }
}

#[async_trait]
impl<'a> Query for TagQuery<'a> {
    type Item = ObjectId;

    fn command(&self) -> Command {
        let keys = self.index.keys();
        Command::set_intersect(self.tags.iter().map(|tag| keys.tag_key(tag)).collect())
    }

    async fn execute(&self) -> Result<Vec<ObjectId>> {
        let ids = members(self.index, self.command()).await?;
        Ok(ids.into_iter().map(ObjectId::from_member).collect())
    }
}
