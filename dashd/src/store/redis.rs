use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Value};
use tracing::{debug, error, info, warn};

use super::{KillReply, KillTarget, Store, StoreError};

const PROBE_KEY: &str = "test:connection";
const BACKOFF_STEP_MS: u64 = 50;
const BACKOFF_MAX_MS: u64 = 1000;

/// Delay before reconnect attempt `attempt` (1-based): grows by 50ms per attempt, capped at 1s.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis((u64::from(attempt) * BACKOFF_STEP_MS).min(BACKOFF_MAX_MS))
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// How many times to try to open the connection before giving up.
    pub attempts: u32,
    /// Write and read back a probe key once connected.
    pub probe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            attempts: 10,
            probe: true,
        }
    }
}

/// Store backed by a Redis server.
///
/// A single multiplexed connection is opened at startup and shared by every
/// request; the handle is cloned per command, the connection itself is not.
pub struct RedisStore {
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    /// Connect to the server at `url`.
    ///
    /// This never fails: when the server can't be reached the error is logged
    /// and the returned store answers every command with `StoreError::NotConnected`.
    pub async fn connect(url: &str, opts: &ConnectOptions) -> Self {
        info!("Attempting to connect to Redis at: {}", url);

        let client = match Client::open(url) {
            Ok(client) => client,
            Err(e) => {
                error!("Invalid Redis URL {}: {}", url, e);
                return Self::disconnected();
            }
        };

        let attempts = opts.attempts.max(1);
        let mut conn = None;
        for attempt in 1..=attempts {
            match client.get_multiplexed_async_connection().await {
                Ok(c) => {
                    info!("Redis client connected");
                    conn = Some(c);
                    break;
                }
                Err(e) => {
                    warn!("Redis connect attempt {} failed: {}", attempt, e);
                    if attempt < attempts {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        let Some(conn) = conn else {
            error!(
                "Failed to connect to Redis after {} attempts, requests will fail",
                attempts
            );
            return Self::disconnected();
        };

        let store = Self { conn: Some(conn) };
        if opts.probe {
            if let Err(e) = store.probe().await {
                error!("Redis connection probe failed: {}", e);
            }
        }
        store
    }

    /// A store without a connection.
    pub fn disconnected() -> Self {
        Self { conn: None }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn conn(&self) -> Result<MultiplexedConnection, StoreError> {
        self.conn.clone().ok_or(StoreError::NotConnected)
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let stamp = format!("Connected at {}", chrono::Utc::now().to_rfc3339());
        self.set(PROBE_KEY, &stamp).await?;
        let value = self.get(PROBE_KEY).await?;
        info!("Test connection value: {:?}", value);
        Ok(())
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        let keys = lossy_strings(reply)?;
        debug!("KEYS {} returned {} keys", pattern, keys.len());
        Ok(keys)
    }

    async fn key_type(&self, key: &str) -> Result<String, StoreError> {
        let mut conn = self.conn()?;
        Ok(redis::cmd("TYPE").arg(key).query_async(&mut conn).await?)
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn()?;
        Ok(redis::cmd("TTL").arg(key).query_async(&mut conn).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        lossy_string(reply)
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        lossy_strings(reply)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("SMEMBERS").arg(key).query_async(&mut conn).await?;
        lossy_strings(reply)
    }

    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;
        lossy_strings(reply)
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(pairs(lossy_strings(reply)?))
    }

    async fn info(&self) -> Result<String, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("INFO").query_async(&mut conn).await?;
        Ok(lossy_string(reply)?.unwrap_or_default())
    }

    async fn client_list(&self) -> Result<String, StoreError> {
        let mut conn = self.conn()?;
        let reply: Value = redis::cmd("CLIENT").arg("LIST").query_async(&mut conn).await?;
        Ok(lossy_string(reply)?.unwrap_or_default())
    }

    async fn client_kill(&self, target: &KillTarget) -> Result<KillReply, StoreError> {
        let mut conn = self.conn()?;
        let mut cmd = redis::cmd("CLIENT");
        cmd.arg("KILL");
        match target {
            KillTarget::Id(id) => cmd.arg("ID").arg(id),
            KillTarget::Addr(addr) => cmd.arg("ADDR").arg(addr),
        };
        let reply: Value = cmd.query_async(&mut conn).await?;
        kill_reply(reply)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let _: Value = redis::cmd("SET").arg(key).arg(value).query_async(&mut conn).await?;
        Ok(())
    }

    async fn lpush(&self, key: &str, values: &[&str]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let _: Value = redis::cmd("LPUSH").arg(key).arg(values).query_async(&mut conn).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let _: Value = redis::cmd("SADD").arg(key).arg(members).query_async(&mut conn).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, members: &[(f64, &str)]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for (score, member) in members {
            cmd.arg(*score).arg(*member);
        }
        let _: Value = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(*field).arg(*value);
        }
        let _: Value = cmd.query_async(&mut conn).await?;
        Ok(())
    }
}

/// Text of a single reply. Bytes that are not UTF-8 are replaced, so binary
/// keys and values can still be shown.
fn lossy_string(reply: Value) -> Result<Option<String>, StoreError> {
    match reply {
        Value::Nil => Ok(None),
        Value::Data(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Value::Status(s) => Ok(Some(s)),
        Value::Okay => Ok(Some("OK".to_string())),
        Value::Int(n) => Ok(Some(n.to_string())),
        other => Err(StoreError::Command(format!(
            "expected a single value, got {:?}",
            other
        ))),
    }
}

fn lossy_strings(reply: Value) -> Result<Vec<String>, StoreError> {
    match reply {
        Value::Nil => Ok(Vec::new()),
        Value::Bulk(items) => items
            .into_iter()
            .map(|item| {
                lossy_string(item)?
                    .ok_or_else(|| StoreError::Command("unexpected nil in array reply".to_string()))
            })
            .collect(),
        other => Err(StoreError::Command(format!(
            "expected an array, got {:?}",
            other
        ))),
    }
}

fn pairs(flat: Vec<String>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        out.push((field, value));
    }
    out
}

fn kill_reply(reply: Value) -> Result<KillReply, StoreError> {
    match reply {
        Value::Int(n) => Ok(KillReply::Count(n)),
        Value::Okay => Ok(KillReply::Status("OK".to_string())),
        Value::Status(s) => Ok(KillReply::Status(s)),
        Value::Data(bytes) => Ok(KillReply::Status(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
        other => Err(StoreError::Command(format!(
            "unexpected CLIENT KILL reply: {:?}",
            other
        ))),
    }
}
