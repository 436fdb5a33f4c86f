use std::fmt::Write;

use anyhow::Result;
use redisinfo::{
    filter_keys, format_bytes, format_time, parse_client_list, parse_info, Page, Summary,
};

use crate::keyinfo::fetch_key;
use crate::store::{KillReply, KillTarget, Store};

/// Headline numbers followed by every INFO section.
pub async fn stats_report(store: &dyn Store) -> Result<String> {
    let keys = store.keys("*").await?;
    let info = store.info().await?;
    let parsed = parse_info(&info).with_key_count(keys.len());
    let summary = Summary::from_info(&parsed, keys.len());

    let mut out = String::new();
    writeln!(out, "Keys:    {}", summary.key_count)?;
    let memory = summary.used_memory_mb.map(|mb| format!("{} MB", mb));
    writeln!(out, "Memory:  {}", or_unknown(memory))?;
    writeln!(out, "Clients: {}", summary.connected_clients)?;
    let uptime = summary.uptime_hours.map(|h| format!("{} hrs", h));
    writeln!(out, "Uptime:  {}", or_unknown(uptime))?;

    for (name, metrics) in parsed.sections().filter(|(name, _)| !name.is_empty()) {
        writeln!(out)?;
        writeln!(out, "# {}", name)?;
        for (metric, value) in metrics {
            writeln!(out, "  {}: {}", metric, value)?;
        }
    }

    Ok(out)
}

/// One line per connected client, with human readable age, idle time and output memory.
pub async fn clients_report(store: &dyn Store) -> Result<String> {
    let clients = parse_client_list(&store.client_list().await?);

    let mut out = String::new();
    writeln!(
        out,
        "{:<8} {:<24} {:<16} {:<14} {:<14} {:<10} {}",
        "ID", "ADDR", "NAME", "AGE", "IDLE", "OMEM", "CMD"
    )?;
    for client in &clients {
        writeln!(
            out,
            "{:<8} {:<24} {:<16} {:<14} {:<14} {:<10} {}",
            client.id().unwrap_or("-"),
            client.addr().unwrap_or("-"),
            client.get("name").unwrap_or("-"),
            client.age_seconds().map(format_time).unwrap_or_else(|| "-".into()),
            client.idle_seconds().map(format_time).unwrap_or_else(|| "-".into()),
            client.output_memory_bytes().map(format_bytes).unwrap_or_else(|| "-".into()),
            client.get("cmd").unwrap_or("-"),
        )?;
    }
    writeln!(out, "{} clients connected", clients.len())?;

    Ok(out)
}

/// A page of key names, optionally narrowed down by a case-insensitive search term.
pub async fn keys_report(
    store: &dyn Store,
    search: &str,
    page: usize,
    per_page: usize,
) -> Result<String> {
    let keys = store.keys("*").await?;
    let matching = filter_keys(&keys, search);
    let page = Page::of(&matching, page, per_page);

    let mut out = String::new();
    for key in &page.items {
        writeln!(out, "{}", key)?;
    }
    if page.total_items == 0 {
        writeln!(out, "No keys found matching your search")?;
    } else {
        writeln!(
            out,
            "{} keys found (page {} of {})",
            page.total_items, page.page, page.total_pages
        )?;
    }

    Ok(out)
}

/// The key record as pretty printed JSON, the same shape the API returns.
pub async fn key_report(store: &dyn Store, key: &str) -> Result<String> {
    let info = fetch_key(store, key).await?;
    Ok(serde_json::to_string_pretty(&info)?)
}

pub async fn kill_report(store: &dyn Store, target: &KillTarget) -> Result<String> {
    let reply = store.client_kill(target).await?;
    Ok(match reply {
        KillReply::Count(n) => format!("{} client(s) killed", n),
        KillReply::Status(s) => s,
    })
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MemoryValue};

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.set_info(
            "# Server\r\nuptime_in_seconds:7200\r\n# \r\n\
             # Clients\r\nconnected_clients:2\r\n\
             # Memory\r\nused_memory:2097152\r\n",
        );
        for key in ["sample:list", "Sample:hash", "user:1"] {
            store.insert(key, MemoryValue::String("v".into()));
        }
        store.add_client("id=3 addr=127.0.0.1:5 name= age=3661 idle=90 omem=1536 cmd=client|list");
        store
    }

    #[tokio::test]
    async fn test_stats_report() {
        let report = stats_report(&store()).await.unwrap();

        assert!(report.starts_with("Keys:    3\nMemory:  2 MB\nClients: 2\nUptime:  2 hrs\n"));
        assert!(report.contains("# Memory\n  used_memory: 2097152\n"));
        assert!(!report.contains("# \n"));
    }

    #[tokio::test]
    async fn test_clients_report() {
        let report = clients_report(&store()).await.unwrap();

        assert!(report.contains("1h 1m 1s"));
        assert!(report.contains("1m 30s"));
        assert!(report.contains("1.5 KB"));
        assert!(report.ends_with("1 clients connected\n"));
    }

    #[tokio::test]
    async fn test_keys_report_search() {
        let store = store();

        let report = keys_report(&store, "SAMPLE", 1, 10).await.unwrap();
        assert_eq!(
            report,
            "Sample:hash\nsample:list\n2 keys found (page 1 of 1)\n"
        );

        let report = keys_report(&store, "nothing", 1, 10).await.unwrap();
        assert_eq!(report, "No keys found matching your search\n");
    }

    #[tokio::test]
    async fn test_kill_report() {
        let store = store();
        let report = kill_report(&store, &KillTarget::Id("3".into())).await.unwrap();
        assert_eq!(report, "1 client(s) killed");
        assert_eq!(store.kills(), vec![KillTarget::Id("3".into())]);
    }
}
