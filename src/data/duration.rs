//! Duration parsing for settings, and time/latency formatting for display.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
];

/// Parse interval strings like "1s", "250ms", "0.5s".
///
/// A bare number is taken as seconds, so `--interval 2` works.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Ok(secs) = s.parse::<f64>() {
        return from_nanos(secs * 1e9, s);
    }

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            return from_nanos(val * multiplier, s);
        }
    }

    bail!("Unknown duration format: {}", s)
}

fn from_nanos(nanos: f64, raw: &str) -> Result<Duration> {
    if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
        bail!("Duration out of range: {}", raw);
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Serde adapter accepting either a duration string or a number of seconds.
pub fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(f64),
        Text(String),
    }

    let parsed = match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => from_nanos(secs * 1e9, &secs.to_string()),
        Raw::Text(text) => parse_duration(&text),
    };
    parsed.map_err(serde::de::Error::custom)
}

/// Format a latency in milliseconds, e.g. `"42.17 ms"`.
pub fn format_latency(ms: f64) -> String {
    format!("{:.2} ms", ms)
}

/// Format epoch seconds as local wall-clock `HH:MM:SS`.
pub fn format_clock(epoch_secs: f64) -> String {
    if !epoch_secs.is_finite() {
        return "--:--:--".to_string();
    }
    let secs = epoch_secs.floor();
    let nanos = ((epoch_secs - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(utc) => utc.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        let d = parse_duration("1s").unwrap();
        assert_eq!(d, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_milliseconds() {
        let d = parse_duration("250ms").unwrap();
        assert_eq!(d, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let d = parse_duration("0.5s").unwrap();
        assert_eq!(d, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_bare_number_is_seconds() {
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_microseconds() {
        let d = parse_duration("16µs").unwrap();
        assert_eq!(d.as_micros(), 16);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_deserialize_string_or_number() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_duration")]
            interval: Duration,
        }

        let w: Wrapper = serde_json::from_str(r#"{"interval": "500ms"}"#).unwrap();
        assert_eq!(w.interval, Duration::from_millis(500));
        let w: Wrapper = serde_json::from_str(r#"{"interval": 3}"#).unwrap();
        assert_eq!(w.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(42.168), "42.17 ms");
        assert_eq!(format_latency(-5000.0), "-5000.00 ms");
    }

    #[test]
    fn test_format_clock_shape() {
        let s = format_clock(1_700_000_000.25);
        assert_eq!(s.len(), 8);
        assert_eq!(s.as_bytes()[2], b':');
        assert_eq!(format_clock(f64::NAN), "--:--:--");
    }
}
