//! CLI configuration: a JSON file merged with command-line overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagindex::{IndexConfig, RemovalPolicy};

const DEFAULT_SNAPSHOT: &str = "tagindex.json";

/// Which store backs the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process store persisted to a JSON snapshot.
    Memory { snapshot: PathBuf },
    /// A Redis server.
    Redis { url: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory {
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub namespace: Option<String>,
    pub removal: RemovalPolicy,
    pub store: StoreConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Flags that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub redis: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub index: IndexConfig,
    pub store: StoreConfig,
}

impl CliConfig {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let namespace = overrides.namespace.or(file.namespace).ok_or_else(|| {
            anyhow!("no namespace: pass --namespace or set \"namespace\" in the config file")
        })?;

        let store = match (overrides.redis, overrides.snapshot) {
            (Some(url), _) => StoreConfig::Redis { url },
            (None, Some(snapshot)) => StoreConfig::Memory { snapshot },
            (None, None) => file.store,
        };

        Ok(Self {
            index: IndexConfig::new(namespace).with_removal(file.removal),
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            namespace: Some("docs".into()),
            removal: RemovalPolicy::Unguarded,
            store: StoreConfig::Redis {
                url: "redis://db/".into(),
            },
        };
        let config = CliConfig::resolve(
            file,
            Overrides {
                namespace: Some("pics".into()),
                snapshot: Some(PathBuf::from("s.json")),
                redis: None,
            },
        )
        .unwrap();
        assert_eq!(config.index.namespace, "pics");
        assert_eq!(config.index.removal, RemovalPolicy::Unguarded);
        assert_eq!(
            config.store,
            StoreConfig::Memory {
                snapshot: PathBuf::from("s.json")
            }
        );
    }

    #[test]
    fn namespace_is_required() {
        let err = CliConfig::resolve(FileConfig::default(), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("namespace"));
    }

    #[test]
    fn file_defaults_to_memory_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"namespace": "docs"}"#).unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.store, StoreConfig::default());
        assert_eq!(file.removal, RemovalPolicy::default());
    }

    #[test]
    fn redis_backend_parses() {
        let file: FileConfig = serde_json::from_str(
            r#"{"namespace": "docs", "store": {"backend": "redis", "url": "redis://127.0.0.1/"}}"#,
        )
        .unwrap();
        assert_eq!(
            file.store,
            StoreConfig::Redis {
                url: "redis://127.0.0.1/".into()
            }
        );
    }
}
