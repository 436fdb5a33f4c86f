//! Human readable renderings of the raw numbers found in INFO and CLIENT LIST.

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
const KIB: f64 = 1024.0;

/// Format a byte count using 1024 based units, with at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return format!("0 {}", BYTE_UNITS[0]);
    }

    let value = bytes as f64;
    let exponent = (value.ln() / KIB.ln()).floor() as usize;
    let exponent = exponent.min(BYTE_UNITS.len() - 1);
    let scaled = value / KIB.powi(exponent as i32);

    format!("{} {}", trim_decimals(&format!("{:.2}", scaled)), BYTE_UNITS[exponent])
}

/// Format a duration in seconds as `1d 2h 3m 4s`, leaving out zero units.
///
/// Seconds are always printed when no larger unit is, so zero renders as `0s`.
pub fn format_time(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

fn trim_decimals(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
