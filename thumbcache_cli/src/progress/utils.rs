//! Human-readable formatting for sizes and durations

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{size:.2} {}", UNITS[unit_index])
    }
}

/// Format a number of seconds as `1h 5m`, `2m 30s` or `45s`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours, minutes, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Format an optional ETA, `unknown` when no rate is known yet
pub fn format_eta(seconds: Option<u64>) -> String {
    seconds.map_or_else(|| "unknown".to_string(), format_duration)
}

/// Megabytes to bytes, saturating
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

/// Days to seconds, saturating
pub fn days_to_seconds(days: u64) -> u64 {
    days.saturating_mul(24 * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(500 * 1024 * 1024), "500.00 MB");
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(None), "unknown");
        assert_eq!(format_eta(Some(3)), "3s");
        assert_eq!(format_eta(Some(3725)), "1h 2m");
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(mb_to_bytes(500), 524_288_000);
        assert_eq!(days_to_seconds(30), 2_592_000);
        assert_eq!(mb_to_bytes(u64::MAX), u64::MAX);
    }
}
