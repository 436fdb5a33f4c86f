use tracing::info;

use crate::store::{Store, StoreError};

/// Fill an empty store with one key of every supported type.
pub async fn seed_sample_data(store: &dyn Store) -> Result<(), StoreError> {
    info!("No keys found in Redis, adding sample data...");

    store.set("sample:string", "Hello Redis!").await?;
    store
        .set(
            "sample:json",
            r#"{"name":"Redis","type":"Database","features":["Fast","In-memory","Versatile"]}"#,
        )
        .await?;
    store
        .lpush("sample:list", &["item1", "item2", "item3"])
        .await?;
    store
        .sadd("sample:set", &["member1", "member2", "member3"])
        .await?;
    store
        .zadd("sample:zset", &[(1.0, "one"), (2.0, "two"), (3.0, "three")])
        .await?;
    store
        .hset(
            "sample:hash",
            &[("field1", "value1"), ("field2", "value2"), ("field3", "value3")],
        )
        .await?;

    info!("Sample data added successfully!");
    Ok(())
}
