//! Redis-backed set store.
//!
//! Batches run as `MULTI`/`EXEC` pipelines. Guarded batches `WATCH` the
//! guarded key, compare its members, and let an aborted `EXEC` report the
//! conflict. All traffic goes through one connection behind an async mutex,
//! so a `WATCH` is never interleaved with another batch from this store.

use super::{Batch, Command, Guard, Reply, SetStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Value};
use std::collections::BTreeSet;
use tokio::sync::Mutex;

pub struct RedisStore {
    conn: Mutex<MultiplexedConnection>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(map_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_err)?;
        tracing::debug!(url, "connected to redis");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn pipeline(commands: &[Command]) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in commands {
            match command {
                Command::SetAdd { key, member } => {
                    pipe.cmd("SADD").arg(key).arg(member);
                }
                Command::SetRemove { key, member } => {
                    pipe.cmd("SREM").arg(key).arg(member);
                }
                Command::SetMembers { key } => {
                    pipe.cmd("SMEMBERS").arg(key);
                }
                Command::SetIntersect { keys } => {
                    pipe.cmd("SINTER").arg(keys);
                }
                Command::Delete { key } => {
                    pipe.cmd("DEL").arg(key);
                }
            }
        }
        pipe
    }
}

fn map_err(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        StoreError::Transport(err.to_string())
    } else {
        StoreError::Rejected(err.to_string())
    }
}

fn decode(value: Value) -> Result<Reply, StoreError> {
    match value {
        Value::Int(n) => Ok(Reply::Count(n)),
        Value::Array(items) | Value::Set(items) => items
            .iter()
            .map(|item| redis::from_redis_value::<String>(item).map_err(map_err))
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Members),
        Value::Nil => Ok(Reply::Members(Vec::new())),
        other => Err(StoreError::UnexpectedReply(format!("{other:?}"))),
    }
}

impl RedisStore {
    /// Watch the guarded key and check it still holds the expected members.
    async fn watch(conn: &mut MultiplexedConnection, guard: &Guard) -> Result<(), StoreError> {
        let Guard::SetUnchanged { key, members } = guard;
        let _: () = redis::cmd("WATCH")
            .arg(key)
            .query_async(conn)
            .await
            .map_err(map_err)?;
        let current: BTreeSet<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(conn)
            .await
            .map_err(map_err)?;
        let expected: BTreeSet<String> = members.iter().cloned().collect();
        if current != expected {
            return Err(StoreError::Conflict { key: key.clone() });
        }
        Ok(())
    }

    async fn run_guarded(
        conn: &mut MultiplexedConnection,
        batch: &Batch,
    ) -> Result<Option<Vec<Value>>, StoreError> {
        if let Some(guard) = &batch.guard {
            Self::watch(conn, guard).await?;
        }
        Self::pipeline(&batch.commands)
            .query_async(conn)
            .await
            .map_err(map_err)
    }
}

#[async_trait]
impl SetStore for RedisStore {
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.lock().await;
        let results = match Self::run_guarded(&mut conn, &batch).await {
            Ok(results) => results,
            Err(err) => {
                // EXEC clears the watch; any earlier exit must do it here
                // or the next batch on this connection inherits it.
                if batch.guard.is_some() {
                    let unwatch: Result<(), RedisError> =
                        redis::cmd("UNWATCH").query_async(&mut *conn).await;
                    if let Err(unwatch) = unwatch {
                        tracing::warn!(error = %unwatch, "UNWATCH failed");
                    }
                }
                return Err(err);
            }
        };

        let Some(values) = results else {
            return Err(match &batch.guard {
                Some(Guard::SetUnchanged { key, .. }) => StoreError::Conflict { key: key.clone() },
                None => StoreError::UnexpectedReply("transaction aborted".to_string()),
            });
        };

        if values.len() != batch.len() {
            return Err(StoreError::UnexpectedReply(format!(
                "{} replies for {} commands",
                values.len(),
                batch.len()
            )));
        }
        values.into_iter().map(decode).collect()
    }
}
