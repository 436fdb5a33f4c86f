use redisinfo::Fields;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::store::{Store, StoreError};

const NO_EXPIRATION: &str = "No expiration";

/// Value of a key, shaped by its type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Unknown type, missing key, or a string that vanished before it was read.
    Null,
    Scalar(String),
    /// Lists, sets, and sorted sets (member and score alternating).
    Sequence(Vec<String>),
    Mapping(Fields),
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Persistent,
    Seconds(i64),
}

impl From<i64> for Ttl {
    fn from(ttl: i64) -> Self {
        if ttl == -1 {
            Ttl::Persistent
        } else {
            Ttl::Seconds(ttl)
        }
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ttl::Persistent => serializer.serialize_str(NO_EXPIRATION),
            Ttl::Seconds(secs) => serializer.serialize_i64(*secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyInfo {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: KeyValue,
    pub ttl: Ttl,
}

/// Fetch the type, full value and TTL of `key`.
///
/// Collections are read in full. A key that disappears after its type was
/// read comes back with a null or empty value rather than an error.
pub async fn fetch_key(store: &dyn Store, key: &str) -> Result<KeyInfo, StoreError> {
    let key_type = store.key_type(key).await?;
    debug!("Key {} has type {}", key, key_type);

    let value = match key_type.as_str() {
        "string" => match store.get(key).await? {
            Some(s) => KeyValue::Scalar(s),
            None => KeyValue::Null,
        },
        "list" => KeyValue::Sequence(store.lrange_all(key).await?),
        "set" => KeyValue::Sequence(store.smembers(key).await?),
        "zset" => KeyValue::Sequence(store.zrange_with_scores(key).await?),
        "hash" => KeyValue::Mapping(store.hgetall(key).await?.into_iter().collect()),
        _ => KeyValue::Null,
    };

    let ttl = store.ttl(key).await?.into();

    Ok(KeyInfo {
        key: key.to_string(),
        key_type,
        value,
        ttl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MemoryValue};
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_each_type() {
        let store = MemoryStore::new();
        store.insert("s", MemoryValue::String("hello".into()));
        store.insert("l", MemoryValue::List(vec!["a".into(), "b".into()]));
        store.insert("st", MemoryValue::Set(vec!["m".into()]));
        store.insert(
            "z",
            MemoryValue::ZSet(vec![("one".into(), 1.0), ("two".into(), 2.0)]),
        );
        store.insert("h", MemoryValue::Hash(pairs(&[("f2", "v2"), ("f1", "v1")])));
        store.expire("h", 60);

        let s = fetch_key(&store, "s").await.unwrap();
        assert_eq!(s.value, KeyValue::Scalar("hello".into()));
        assert_eq!(s.ttl, Ttl::Persistent);

        let l = fetch_key(&store, "l").await.unwrap();
        assert_eq!(l.key_type, "list");
        assert_eq!(l.value, KeyValue::Sequence(vec!["a".into(), "b".into()]));

        let st = fetch_key(&store, "st").await.unwrap();
        assert_eq!(st.value, KeyValue::Sequence(vec!["m".into()]));

        let z = fetch_key(&store, "z").await.unwrap();
        assert_eq!(
            serde_json::to_value(&z.value).unwrap(),
            json!(["one", "1", "two", "2"])
        );

        let h = fetch_key(&store, "h").await.unwrap();
        assert_eq!(
            serde_json::to_value(&h).unwrap(),
            json!({"key": "h", "type": "hash", "value": {"f2": "v2", "f1": "v1"}, "ttl": 60})
        );
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryStore::new();
        let info = fetch_key(&store, "nope").await.unwrap();

        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"key": "nope", "type": "none", "value": null, "ttl": -2})
        );
    }

    #[tokio::test]
    async fn test_key_vanishes_between_calls() {
        let store = MemoryStore::new();
        store.insert("gone", MemoryValue::String("soon".into()));
        store.insert("gone-list", MemoryValue::List(vec!["x".into()]));
        store.vanish_after_type("gone");
        store.vanish_after_type("gone-list");

        let info = fetch_key(&store, "gone").await.unwrap();
        assert_eq!(info.key_type, "string");
        assert_eq!(info.value, KeyValue::Null);
        assert_eq!(info.ttl, Ttl::Seconds(-2));

        let info = fetch_key(&store, "gone-list").await.unwrap();
        assert_eq!(info.value, KeyValue::Sequence(Vec::new()));
    }

    #[test]
    fn test_ttl_serialization() {
        assert_eq!(
            serde_json::to_value(Ttl::from(-1)).unwrap(),
            json!("No expiration")
        );
        assert_eq!(serde_json::to_value(Ttl::from(42)).unwrap(), json!(42));
    }
}
