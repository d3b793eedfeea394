//! Timestamp parsing.
//!
//! The backend writes naive UTC timestamps (`2026-03-01T08:30:00.123456`)
//! without an offset. Both that form and RFC 3339 are accepted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Deserialize a timestamp that may lack a UTC offset.
///
/// # Errors
///
/// Fails if the value is not a string in either accepted format.
pub fn utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

/// Parse an RFC 3339 or naive UTC timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_naive_is_utc() {
        let ts = parse_timestamp("2026-03-01T08:30:00.123456").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2026, 3, 1, 8));
    }

    #[test]
    fn test_offset_is_normalized() {
        let ts = parse_timestamp("2026-03-01T10:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_space_separator_and_garbage() {
        assert!(parse_timestamp("2026-03-01 08:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
