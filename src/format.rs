//! Human-readable labels for sizes, durations and timestamps.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};

/// `0 B`, `512 B`, `1.5 KB`, `3.2 MB`, ...
pub fn format_bytes(value: u64) -> String {
    if value == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut index = 0;
    let mut scaled = value as f64;
    while scaled >= 1024.0 && index < UNITS.len() - 1 {
        scaled /= 1024.0;
        index += 1;
    }
    if index == 0 {
        format!("{} {}", value, UNITS[0])
    } else {
        format!("{:.1} {}", scaled, UNITS[index])
    }
}

/// Generation duration in milliseconds: `-`, `850 ms`, `1.5 s`.
pub fn format_duration(value: Option<u64>) -> String {
    match value {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{} ms", ms),
        Some(ms) => format!("{:.1} s", ms as f64 / 1000.0),
    }
}

/// Elapsed busy time as `MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Record creation time in local time, `Unknown` when missing or malformed.
pub fn format_created_at(value: Option<&str>) -> String {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| format_timestamp(&parsed.with_timezone(&Local)))
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn format_timestamp<Tz: TimeZone>(value: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    value.format("%b %d, %I:%M %p").to_string()
}

/// Effective on-screen scale relative to physical pixels, e.g. `0.78x`.
pub fn format_scale(scale: Option<f32>) -> String {
    match scale {
        Some(s) if s.is_finite() && s > 0.0 => format!("{:.2}x", s),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024 * 1024), "5120.0 GB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(0)), "0 ms");
        assert_eq!(format_duration(Some(850)), "850 ms");
        assert_eq!(format_duration(Some(1500)), "1.5 s");
    }

    #[test]
    fn elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(999)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
    }

    #[test]
    fn timestamps() {
        let at = Utc.with_ymd_and_hms(2025, 10, 17, 14, 5, 0).unwrap();
        assert_eq!(format_timestamp(&at), "Oct 17, 02:05 PM");
        assert_eq!(format_created_at(None), "Unknown");
        assert_eq!(format_created_at(Some("yesterday")), "Unknown");
        assert_ne!(format_created_at(Some("2025-10-17T14:05:00+00:00")), "Unknown");
    }

    #[test]
    fn scale_label() {
        assert_eq!(format_scale(Some(0.78125)), "0.78x");
        assert_eq!(format_scale(None), "-");
        assert_eq!(format_scale(Some(f32::NAN)), "-");
    }
}
