//! Tagindex CLI
//!
//! Command-line access to a tag index:
//! - Tagging and untagging objects
//! - Removing objects entirely
//! - Listing an object's tags, or the tags two objects share
//! - Listing the objects that carry every tag in a list

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tagindex::{MemoryStore, Query, SetStore, TagIndex};
use tracing_subscriber::EnvFilter;

mod config;

use config::{CliConfig, FileConfig, Overrides, StoreConfig};

#[derive(Parser)]
#[command(name = "tagindex")]
#[command(author, version, about = "Tagindex: bidirectional tag index")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Namespace key (overrides the config file)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
    /// Use the in-process store persisted to this snapshot file
    #[arg(long, global = true, conflicts_with = "redis")]
    snapshot: Option<PathBuf>,
    /// Use the Redis server at this URL
    #[arg(long, global = true)]
    redis: Option<String>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag an object: `add red,blue 42`
    Add {
        /// Comma-separated tags
        tags: String,
        id: String,
    },
    /// Remove some tags from an object
    RemoveTags {
        /// Comma-separated tags
        tags: String,
        id: String,
    },
    /// Remove an object and all of its tags
    RemoveObject { id: String },
    /// List the tags of an object, or the tags shared by two objects
    TagsOf { id: String, other: Option<String> },
    /// List the objects carrying every given tag
    ObjectsWith {
        /// Comma-separated tags
        tags: String,
    },
    /// Print the library version
    Version,
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Add { .. } | Self::RemoveTags { .. } | Self::RemoveObject { .. }
        )
    }
}

/// A connected store plus what is needed to persist it afterwards.
struct Backend {
    store: Arc<dyn SetStore>,
    snapshot: Option<(Arc<MemoryStore>, PathBuf)>,
}

impl Backend {
    async fn open(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Memory { snapshot } => {
                let memory = Arc::new(MemoryStore::open(snapshot)?);
                Ok(Self {
                    store: memory.clone(),
                    snapshot: Some((memory, snapshot.clone())),
                })
            }
            StoreConfig::Redis { url } => Self::open_redis(url).await,
        }
    }

    #[cfg(feature = "redis")]
    async fn open_redis(url: &str) -> Result<Self> {
        use anyhow::Context;

        let store = tagindex::RedisStore::connect(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        Ok(Self {
            store: Arc::new(store),
            snapshot: None,
        })
    }

    #[cfg(not(feature = "redis"))]
    async fn open_redis(url: &str) -> Result<Self> {
        anyhow::bail!("cannot use {url}: tagindex was built without the `redis` feature")
    }

    fn persist(&self) -> Result<()> {
        if let Some((memory, path)) = &self.snapshot {
            memory.save(path)?;
        }
        Ok(())
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_sorted<T: Ord + std::fmt::Display>(mut items: Vec<T>) {
    items.sort();
    for item in items {
        println!("{item}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Version = cli.command {
        println!("tagindex {}", tagindex::VERSION);
        return Ok(());
    }

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = CliConfig::resolve(
        file,
        Overrides {
            namespace: cli.namespace.clone(),
            snapshot: cli.snapshot.clone(),
            redis: cli.redis.clone(),
        },
    )?;

    let backend = Backend::open(&config.store).await?;
    let index = TagIndex::with_config(backend.store.clone(), config.index)?;
    tracing::debug!(namespace = index.namespace(), "index ready");

    match &cli.command {
        Commands::Add { tags, id } => index.add(tags.as_str(), id.as_str()).await?,
        Commands::RemoveTags { tags, id } => {
            index.remove_tags(tags.as_str(), id.as_str()).await?
        }
        Commands::RemoveObject { id } => {
            let removed = index.remove_object(id.as_str()).await?;
            print_sorted(removed);
        }
        Commands::TagsOf { id, other } => {
            let tags = match other {
                Some(other) => {
                    index
                        .query_by_objects(id.as_str(), other.as_str())?
                        .execute()
                        .await?
                }
                None => index.query_by_object(id.as_str())?.execute().await?,
            };
            print_sorted(tags);
        }
        Commands::ObjectsWith { tags } => {
            let ids = index.query_by_tags(tags.as_str())?.execute().await?;
            print_sorted(ids);
        }
        Commands::Version => {}
    }

    if cli.command.mutates() {
        backend.persist()?;
    }
    Ok(())
}
