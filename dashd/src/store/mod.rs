use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

mod memory;
mod redis;

pub use self::memory::{MemoryStore, MemoryValue};
pub use self::redis::{backoff_delay, ConnectOptions, RedisStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("The client is closed")]
    NotConnected,

    #[error("{0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("{0}")]
    Command(String),
}

/// Which connection a `CLIENT KILL` should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillTarget {
    Id(String),
    Addr(String),
}

/// Reply to `CLIENT KILL`, passed through to callers as the store sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KillReply {
    Count(i64),
    Status(String),
}

/// `Store` is the set of commands the dashboard issues against the data store.
///
/// Implementations are shared between all requests, so they must be usable
/// through a shared reference.
#[async_trait]
pub trait Store: Send + Sync {
    /// Key names matching a glob pattern (`KEYS`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Type tag of a key (`TYPE`), `none` for a missing key.
    async fn key_type(&self, key: &str) -> Result<String, StoreError>;

    /// Remaining time to live in seconds (`TTL`): `-1` without expiry, `-2` for a missing key.
    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// The whole list (`LRANGE key 0 -1`).
    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// The whole sorted set as alternating member and score entries (`ZRANGE key 0 -1 WITHSCORES`).
    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// All field/value pairs of a hash, in the order the store returns them.
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Raw `INFO` report.
    async fn info(&self) -> Result<String, StoreError>;

    /// Raw `CLIENT LIST` report.
    async fn client_list(&self) -> Result<String, StoreError>;

    async fn client_kill(&self, target: &KillTarget) -> Result<KillReply, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn lpush(&self, key: &str, values: &[&str]) -> Result<(), StoreError>;

    async fn sadd(&self, key: &str, members: &[&str]) -> Result<(), StoreError>;

    async fn zadd(&self, key: &str, members: &[(f64, &str)]) -> Result<(), StoreError>;

    async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError>;
}
