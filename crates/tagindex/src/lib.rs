//! Tagindex: a bidirectional tag index
//!
//! Associates object ids with tag labels and answers queries in both
//! directions, on top of any set-oriented key-value store:
//!
//! ```text
//! ┌──────────────┐  add / remove_tags / remove_object   ┌──────────────────┐
//! │   TagIndex   │─────────────────────────────────────►│                  │
//! │ (namespace)  │        one atomic Batch per call     │     SetStore     │
//! └──────┬───────┘                                      │  (memory/redis)  │
//!        │ query_by_object / query_by_objects /         │                  │
//!        ▼ query_by_tags                                │  ns:tag:<tag>    │
//! ┌──────────────┐          execute()                   │  ns:object:<id>  │
//! │    Query     │─────────────────────────────────────►│                  │
//! └──────────────┘                                      └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> tagindex::Result<()> {
//! use std::sync::Arc;
//! use tagindex::{MemoryStore, ObjectId, Query, TagIndex};
//!
//! let index = TagIndex::new(Arc::new(MemoryStore::new()), "docs")?;
//! index.add("red,blue", 1).await?;
//! index.add("blue,green", 2).await?;
//!
//! let both = index.query_by_tags("red,blue")?.execute().await?;
//! assert_eq!(both, vec![ObjectId::from(1)]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod index;
pub mod keys;
pub mod query;
pub mod store;
pub mod tags;


pub use config::{IndexConfig, RemovalPolicy};
pub use error::{Result, TagIndexError};
pub use id::ObjectId;
pub use index::TagIndex;
pub use keys::KeySpace;
pub use query::{ObjectPairQuery, ObjectQuery, Query, TagQuery};
pub use store::{Batch, Command, Guard, MemoryStore, Reply, SetStore, StoreError};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use tags::{Tag, TagList, SEPARATOR};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
