use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{KillReply, KillTarget, Store, StoreError};

/// A typed value held by the [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    String(String),
    List(Vec<String>),
    Set(Vec<String>),
    ZSet(Vec<(String, f64)>),
    Hash(Vec<(String, String)>),
}

impl MemoryValue {
    fn type_name(&self) -> &'static str {
        match self {
            MemoryValue::String(_) => "string",
            MemoryValue::List(_) => "list",
            MemoryValue::Set(_) => "set",
            MemoryValue::ZSet(_) => "zset",
            MemoryValue::Hash(_) => "hash",
        }
    }
}

#[derive(Default)]
struct Inner {
    values: BTreeMap<String, MemoryValue>,
    ttls: HashMap<String, i64>,
    info: String,
    clients: Vec<String>,
    kills: Vec<KillTarget>,
    failure: Option<String>,
    vanish_on_type: HashSet<String>,
}

/// In-process store with Redis-like replies, used to exercise the API without a server.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Like `inner`, but fails when a failure was injected.
    fn checked(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let inner = self.inner();
        if let Some(msg) = inner.failure.clone() {
            return Err(StoreError::Command(msg));
        }
        Ok(inner)
    }

    pub fn insert(&self, key: &str, value: MemoryValue) {
        self.inner().values.insert(key.to_string(), value);
    }

    pub fn expire(&self, key: &str, seconds: i64) {
        self.inner().ttls.insert(key.to_string(), seconds);
    }

    pub fn set_info(&self, info: &str) {
        self.inner().info = info.to_string();
    }

    /// Register a connection, given as one `CLIENT LIST` line.
    pub fn add_client(&self, line: &str) {
        self.inner().clients.push(line.to_string());
    }

    /// Every `CLIENT KILL` received so far.
    pub fn kills(&self) -> Vec<KillTarget> {
        self.inner().kills.clone()
    }

    /// Make every following command fail with `msg`.
    pub fn fail_with(&self, msg: &str) {
        self.inner().failure = Some(msg.to_string());
    }

    /// Delete `key` right after its type was read, as if another client removed it.
    pub fn vanish_after_type(&self, key: &str) {
        self.inner().vanish_on_type.insert(key.to_string());
    }

    pub fn value(&self, key: &str) -> Option<MemoryValue> {
        self.inner().values.get(key).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.checked()?;
        Ok(inner
            .values
            .keys()
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .cloned()
            .collect())
    }

    async fn key_type(&self, key: &str) -> Result<String, StoreError> {
        let mut inner = self.checked()?;
        let name = inner
            .values
            .get(key)
            .map_or("none", MemoryValue::type_name)
            .to_string();
        if inner.vanish_on_type.remove(key) {
            inner.values.remove(key);
            inner.ttls.remove(key);
        }
        Ok(name)
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let inner = self.checked()?;
        if !inner.values.contains_key(key) {
            return Ok(-2);
        }
        Ok(inner.ttls.get(key).copied().unwrap_or(-1))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.checked()?;
        match inner.values.get(key) {
            Some(MemoryValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.checked()?;
        match inner.values.get(key) {
            Some(MemoryValue::List(items)) => Ok(items.clone()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.checked()?;
        match inner.values.get(key) {
            Some(MemoryValue::Set(members)) => Ok(members.clone()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.checked()?;
        match inner.values.get(key) {
            Some(MemoryValue::ZSet(members)) => {
                let mut sorted = members.clone();
                sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(sorted
                    .into_iter()
                    .flat_map(|(member, score)| [member, score.to_string()])
                    .collect())
            }
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let inner = self.checked()?;
        match inner.values.get(key) {
            Some(MemoryValue::Hash(fields)) => Ok(fields.clone()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn info(&self) -> Result<String, StoreError> {
        Ok(self.checked()?.info.clone())
    }

    async fn client_list(&self) -> Result<String, StoreError> {
        let inner = self.checked()?;
        Ok(inner
            .clients
            .iter()
            .map(|line| format!("{}\n", line))
            .collect())
    }

    async fn client_kill(&self, target: &KillTarget) -> Result<KillReply, StoreError> {
        let mut inner = self.checked()?;
        inner.kills.push(target.clone());

        let token = match target {
            KillTarget::Id(id) => format!("id={}", id),
            KillTarget::Addr(addr) => format!("addr={}", addr),
        };
        let before = inner.clients.len();
        inner
            .clients
            .retain(|line| !line.split(' ').any(|t| t == token));
        Ok(KillReply::Count((before - inner.clients.len()) as i64))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.checked()?;
        inner
            .values
            .insert(key.to_string(), MemoryValue::String(value.to_string()));
        inner.ttls.remove(key);
        Ok(())
    }

    async fn lpush(&self, key: &str, values: &[&str]) -> Result<(), StoreError> {
        let mut inner = self.checked()?;
        let entry = inner
            .values
            .entry(key.to_string())
            .or_insert_with(|| MemoryValue::List(Vec::new()));
        let MemoryValue::List(items) = entry else {
            return Err(wrong_type());
        };
        for value in values {
            items.insert(0, value.to_string());
        }
        Ok(())
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> Result<(), StoreError> {
        let mut inner = self.checked()?;
        let entry = inner
            .values
            .entry(key.to_string())
            .or_insert_with(|| MemoryValue::Set(Vec::new()));
        let MemoryValue::Set(set) = entry else {
            return Err(wrong_type());
        };
        for member in members {
            if !set.iter().any(|m| m == member) {
                set.push(member.to_string());
            }
        }
        Ok(())
    }

    async fn zadd(&self, key: &str, members: &[(f64, &str)]) -> Result<(), StoreError> {
        let mut inner = self.checked()?;
        let entry = inner
            .values
            .entry(key.to_string())
            .or_insert_with(|| MemoryValue::ZSet(Vec::new()));
        let MemoryValue::ZSet(zset) = entry else {
            return Err(wrong_type());
        };
        for (score, member) in members {
            match zset.iter_mut().find(|(m, _)| m == member) {
                Some(existing) => existing.1 = *score,
                None => zset.push((member.to_string(), *score)),
            }
        }
        Ok(())
    }

    async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut inner = self.checked()?;
        let entry = inner
            .values
            .entry(key.to_string())
            .or_insert_with(|| MemoryValue::Hash(Vec::new()));
        let MemoryValue::Hash(hash) = entry else {
            return Err(wrong_type());
        };
        for (field, value) in fields {
            match hash.iter_mut().find(|(f, _)| f == field) {
                Some(existing) => existing.1 = value.to_string(),
                None => hash.push((field.to_string(), value.to_string())),
            }
        }
        Ok(())
    }
}

fn wrong_type() -> StoreError {
    StoreError::Command(
        "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
    )
}

/// Glob matching supporting `*` and `?`, enough for `KEYS` patterns.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b"anything"));
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"sample:*", b"sample:list"));
        assert!(!glob_match(b"sample:*", b"user:1"));
        assert!(glob_match(b"user:?", b"user:1"));
        assert!(!glob_match(b"user:?", b"user:10"));
    }

    #[tokio::test]
    async fn test_ttl_sentinels() {
        let store = MemoryStore::new();
        store.insert("a", MemoryValue::String("1".into()));
        store.insert("b", MemoryValue::String("2".into()));
        store.expire("b", 30);

        assert_eq!(store.ttl("a").await.unwrap(), -1);
        assert_eq!(store.ttl("b").await.unwrap(), 30);
        assert_eq!(store.ttl("missing").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_zrange_orders_by_score() {
        let store = MemoryStore::new();
        store
            .zadd("z", &[(2.0, "two"), (1.0, "one"), (2.5, "half")])
            .await
            .unwrap();

        assert_eq!(
            store.zrange_with_scores("z").await.unwrap(),
            vec!["one", "1", "two", "2", "half", "2.5"]
        );
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set("s", "v").await.unwrap();
        assert!(store.lpush("s", &["x"]).await.is_err());
        assert!(store.hgetall("s").await.is_err());
    }

    #[tokio::test]
    async fn test_kill_removes_client() {
        let store = MemoryStore::new();
        store.add_client("id=1 addr=127.0.0.1:1");
        store.add_client("id=2 addr=127.0.0.1:2");

        let reply = store
            .client_kill(&KillTarget::Addr("127.0.0.1:2".into()))
            .await
            .unwrap();
        assert_eq!(reply, KillReply::Count(1));
        assert_eq!(store.client_list().await.unwrap(), "id=1 addr=127.0.0.1:1\n");
    }
}
