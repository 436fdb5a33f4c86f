use redisinfo::{format_bytes, format_time, parse_client_list, parse_info, Summary};
use serde_json::json;

const INFO_REPORT: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
redis_mode:standalone\r\n\
executable:/usr/local/bin/redis-server\r\n\
uptime_in_seconds:86461\r\n\
\r\n\
# Clients\r\n\
connected_clients:2\r\n\
blocked_clients:0\r\n\
\r\n\
# Memory\r\n\
used_memory:1572864\r\n\
used_memory_human:1.50M\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=7,expires=1,avg_ttl=0\r\n";

const CLIENT_REPORT: &str = "id=3 addr=127.0.0.1:52555 laddr=127.0.0.1:6379 fd=8 name= age=3661 idle=90 flags=N db=0 omem=1536 cmd=client|list\n\
id=5 addr=127.0.0.1:52556 laddr=127.0.0.1:6379 fd=9 name=worker age=10 idle=0 flags=N db=0 omem=0 cmd=ping\n";

#[test]
fn test_info_serializes_with_key_count() {
    let parsed = parse_info(INFO_REPORT).with_key_count(7);
    let value = serde_json::to_value(&parsed).unwrap();

    assert_eq!(value["keyCount"], json!(7));
    assert_eq!(value["Server"]["redis_version"], json!("7.2.4"));
    assert_eq!(
        value["Server"]["executable"],
        json!("/usr/local/bin/redis-server")
    );
    assert_eq!(value["Keyspace"]["db0"], json!("keys=7,expires=1,avg_ttl=0"));
    assert_eq!(value.as_object().unwrap().len(), 5);
}

#[test]
fn test_info_without_key_count() {
    let value = serde_json::to_value(parse_info(INFO_REPORT)).unwrap();
    assert!(value.get("keyCount").is_none());
}

#[test]
fn test_summary_of_report() {
    let parsed = parse_info(INFO_REPORT).with_key_count(7);
    let summary = Summary::from_info(&parsed, 0);

    assert_eq!(summary.key_count, 7);
    assert_eq!(summary.used_memory_mb, Some(2));
    assert_eq!(summary.connected_clients, "2");
    assert_eq!(summary.uptime_hours, Some(24));
}

#[test]
fn test_client_report_rendering() {
    let clients = parse_client_list(CLIENT_REPORT);
    assert_eq!(clients.len(), 2);

    let first = &clients[0];
    assert_eq!(first.get("name"), None);
    assert_eq!(format_time(first.age_seconds().unwrap()), "1h 1m 1s");
    assert_eq!(format_time(first.idle_seconds().unwrap()), "1m 30s");
    assert_eq!(format_bytes(first.output_memory_bytes().unwrap()), "1.5 KB");

    let second = serde_json::to_value(&clients[1]).unwrap();
    assert_eq!(second["name"], json!("worker"));
    assert_eq!(second["cmd"], json!("ping"));
    assert_eq!(second["omem"], json!("0"));
    assert_eq!(format_time(clients[1].idle_seconds().unwrap()), "0s");
    assert_eq!(format_bytes(clients[1].output_memory_bytes().unwrap()), "0 Bytes");
}
