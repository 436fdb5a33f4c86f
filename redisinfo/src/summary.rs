use crate::info::ParsedInfo;

const MIB: f64 = 1024.0 * 1024.0;
const DEFAULT_CONNECTED_CLIENTS: &str = "1";

/// Headline numbers shown on the dashboard overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub key_count: usize,
    pub used_memory_mb: Option<u64>,
    pub connected_clients: String,
    pub uptime_hours: Option<u64>,
}

impl Summary {
    /// Build the summary from a parsed report.
    ///
    /// `fallback_key_count` is used when the report carries no injected key count.
    pub fn from_info(info: &ParsedInfo, fallback_key_count: usize) -> Self {
        Self {
            key_count: info.key_count().unwrap_or(fallback_key_count),
            used_memory_mb: metric(info, "Memory", "used_memory")
                .map(|bytes| (bytes as f64 / MIB).round() as u64),
            connected_clients: info
                .get("Clients", "connected_clients")
                .unwrap_or(DEFAULT_CONNECTED_CLIENTS)
                .to_string(),
            uptime_hours: metric(info, "Server", "uptime_in_seconds")
                .map(|secs| (secs as f64 / 3600.0).round() as u64),
        }
    }
}

fn metric(info: &ParsedInfo, section: &str, name: &str) -> Option<u64> {
    info.get(section, name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::parse_info;

    #[test]
    fn test_summary_from_info() {
        let info = parse_info(
            "# Server\r\nuptime_in_seconds:5400\r\n# Clients\r\nconnected_clients:4\r\n# Memory\r\nused_memory:3670016\r\n",
        )
        .with_key_count(12);

        let summary = Summary::from_info(&info, 0);
        assert_eq!(summary.key_count, 12);
        assert_eq!(summary.used_memory_mb, Some(4));
        assert_eq!(summary.connected_clients, "4");
        assert_eq!(summary.uptime_hours, Some(2));
    }

    #[test]
    fn test_summary_defaults() {
        let info = parse_info("# Memory\r\nused_memory:lots\r\n");

        let summary = Summary::from_info(&info, 7);
        assert_eq!(summary.key_count, 7);
        assert_eq!(summary.used_memory_mb, None);
        assert_eq!(summary.connected_clients, "1");
        assert_eq!(summary.uptime_hours, None);
    }
}
