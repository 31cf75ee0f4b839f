//! In-process set store.
//!
//! Every batch runs under a single write lock, so batches are atomic with
//! respect to each other. Sets that become empty are dropped, matching the
//! usual behaviour of networked set stores. State can be persisted to a JSON
//! snapshot between runs.

use super::{Batch, Command, Guard, Reply, SetStore, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

type Sets = BTreeMap<String, BTreeSet<String>>;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    sets: Sets,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<Sets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            anyhow::bail!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                path.display()
            );
        }
        let mut sets = snapshot.sets;
        sets.retain(|_, members| !members.is_empty());
        tracing::debug!(path = %path.display(), keys = sets.len(), "loaded store snapshot");
        Ok(Self {
            sets: RwLock::new(sets),
        })
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            sets: self.sets.read().clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::debug!(path = %path.display(), keys = snapshot.sets.len(), "saved store snapshot");
        Ok(())
    }

    /// All live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.sets.read().keys().cloned().collect()
    }

    /// Members of one set, sorted. Missing keys read as empty.
    pub fn members(&self, key: &str) -> Vec<String> {
        self.sets
            .read()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn check(command: &Command) -> Result<(), StoreError> {
        match command {
            Command::SetIntersect { keys } if keys.is_empty() => Err(StoreError::Rejected(
                "SINTER requires at least one key".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn guard_holds(sets: &Sets, guard: &Guard) -> Result<(), StoreError> {
        match guard {
            Guard::SetUnchanged { key, members } => {
                let expected: BTreeSet<&str> = members.iter().map(String::as_str).collect();
                let actual: BTreeSet<&str> = sets
                    .get(key)
                    .map(|set| set.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                if expected == actual {
                    Ok(())
                } else {
                    Err(StoreError::Conflict { key: key.clone() })
                }
            }
        }
    }

    fn apply(sets: &mut Sets, command: Command) -> Reply {
        match command {
            Command::SetAdd { key, member } => {
                let added = sets.entry(key).or_default().insert(member);
                Reply::Count(i64::from(added))
            }
            Command::SetRemove { key, member } => {
                let Some(set) = sets.get_mut(&key) else {
                    return Reply::Count(0);
                };
                let removed = set.remove(&member);
                if set.is_empty() {
                    sets.remove(&key);
                }
                Reply::Count(i64::from(removed))
            }
            Command::SetMembers { key } => Reply::Members(
                sets.get(&key)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default(),
            ),
            Command::SetIntersect { keys } => Reply::Members(intersect(sets, &keys)),
            Command::Delete { key } => Reply::Count(i64::from(sets.remove(&key).is_some())),
        }
    }
}

fn intersect(sets: &Sets, keys: &[String]) -> Vec<String> {
    let mut operands: Vec<&BTreeSet<String>> = Vec::with_capacity(keys.len());
    for key in keys {
        match sets.get(key) {
            Some(set) => operands.push(set),
            None => return Vec::new(),
        }
    }
    operands.sort_by_key(|set| set.len());
    let Some((smallest, rest)) = operands.split_first() else {
        return Vec::new();
    };
    smallest
        .iter()
        .filter(|member| rest.iter().all(|set| set.contains(*member)))
        .cloned()
        .collect()
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        for command in &batch.commands {
            Self::check(command)?;
        }

        let mut sets = self.sets.write();
        if let Some(guard) = &batch.guard {
            Self::guard_holds(&sets, guard)?;
        }
        let replies = batch
            .commands
            .into_iter()
            .map(|command| Self::apply(&mut sets, command))
            .collect();
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn add_and_remove_report_counts() {
        let store = MemoryStore::new();
        let mut batch = Batch::new();
        batch
            .push(Command::set_add("s", "a"))
            .push(Command::set_add("s", "a"))
            .push(Command::set_remove("s", "b"))
            .push(Command::set_members("s"));
        let replies = store.execute(batch).await.unwrap();
        assert_eq!(
            replies,
            vec![
                Reply::Count(1),
                Reply::Count(0),
                Reply::Count(0),
                Reply::Members(vec!["a".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn emptied_sets_disappear() {
        let store = MemoryStore::new();
        store
            .execute(Batch::single(Command::set_add("s", "a")))
            .await
            .unwrap();
        store
            .execute(Batch::single(Command::set_remove("s", "a")))
            .await
            .unwrap();
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn intersection_with_missing_key_is_empty() {
        let store = MemoryStore::new();
        let mut batch = Batch::new();
        batch
            .push(Command::set_add("x", "1"))
            .push(Command::set_add("x", "2"))
            .push(Command::set_add("y", "2"))
            .push(Command::set_intersect(vec!["x".into(), "y".into()]))
            .push(Command::set_intersect(vec!["x".into(), "nope".into()]))
            .push(Command::set_intersect(vec!["x".into()]));
        let replies = store.execute(batch).await.unwrap();
        assert_eq!(replies[3], Reply::Members(vec!["2".into()]));
        assert_eq!(replies[4], Reply::Members(vec![]));
        assert_eq!(replies[5], Reply::Members(vec!["1".into(), "2".into()]));
    }

    #[tokio::test]
    async fn rejected_command_applies_nothing() {
        let store = MemoryStore::new();
        let mut batch = Batch::new();
        batch
            .push(Command::set_add("s", "a"))
            .push(Command::set_intersect(vec![]));
        let err = store.execute(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn failed_guard_applies_nothing() {
        let store = MemoryStore::new();
        store
            .execute(Batch::single(Command::set_add("s", "a")))
            .await
            .unwrap();

        let stale = Batch::single(Command::delete("s")).guarded(Guard::SetUnchanged {
            key: "s".into(),
            members: vec![],
        });
        let err = store.execute(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.members("s"), vec!["a".to_string()]);

        let fresh = Batch::single(Command::delete("s")).guarded(Guard::SetUnchanged {
            key: "s".into(),
            members: vec!["a".into()],
        });
        assert_eq!(store.execute(fresh).await.unwrap(), vec![Reply::Count(1)]);
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = MemoryStore::new();
        let mut batch = Batch::new();
        batch
            .push(Command::set_add("ns:tag:a", "1"))
            .push(Command::set_add("ns:object:1", "a"));
        store.execute(batch).await.unwrap();
        store.save(&path).unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.keys(), store.keys());
        assert_eq!(reopened.members("ns:object:1"), vec!["a".to_string()]);

        let fresh = MemoryStore::open(&dir.path().join("missing.json")).unwrap();
        assert!(fresh.keys().is_empty());
    }

    #[test]
    fn corrupt_snapshot_error_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = MemoryStore::open(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("parsing snapshot"), "{message}");
        assert!(message.contains("corrupt.json"), "{message}");
    }
}
