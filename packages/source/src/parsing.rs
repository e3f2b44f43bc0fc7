//! Shared parsing utilities for feed adapters.
//!
//! All timestamp parsing is fail-soft: malformed or missing input yields
//! `None`, never an error, so one bad row can't poison a batch.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone as _, Utc};

/// UTC offset for campus local time, in hours. The regional crime-mapping
/// feed encodes timestamps in local wall-clock time with no zone marker.
pub const CAMPUS_UTC_OFFSET_HOURS: i32 = -5;

/// Datetime formats observed across the feeds, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only formats, interpreted as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a feed datetime string against the known formats.
/// Returns `None` for missing, empty, or unparseable input.
#[must_use]
pub fn parse_feed_datetime(value: Option<&str>) -> Option<DateTime<Utc>> {
    let s = value?.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Parses a 14-digit `YYYYMMDDHHMMSS` numeric blob as campus local time.
///
/// The value is zero-padded to 14 digits before slicing, so a feed row
/// that drops a leading zero still parses. Interpreted in the campus UTC
/// offset (never UTC — the feed reports wall-clock time). Returns `None`
/// for non-positive values or out-of-range date components.
#[must_use]
pub fn parse_compact_local_datetime(value: i64) -> Option<DateTime<Utc>> {
    if value <= 0 {
        return None;
    }

    let raw = format!("{value:014}");
    let year: i32 = raw.get(0..4)?.parse().ok()?;
    let month: u32 = raw.get(4..6)?.parse().ok()?;
    let day: u32 = raw.get(6..8)?.parse().ok()?;
    let hour: u32 = raw.get(8..10)?.parse().ok()?;
    let minute: u32 = raw.get(10..12)?.parse().ok()?;
    let second: u32 = raw.get(12..14)?.parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = FixedOffset::east_opt(CAMPUS_UTC_OFFSET_HOURS * 3600)?;
    Some(
        offset
            .from_local_datetime(&naive)
            .single()?
            .with_timezone(&Utc),
    )
}

/// Extracts a string field from a JSON value, treating empty strings as
/// absent.
#[must_use]
pub fn non_empty_str(value: Option<&serde_json::Value>) -> Option<&str> {
    let s = value?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn parses_iso_datetime() {
        let dt = parse_feed_datetime(Some("2024-01-15 14:30:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn parses_us_datetime() {
        let dt = parse_feed_datetime(Some("01/15/2024 02:30 PM")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let dt = parse_feed_datetime(Some("2024-01-15")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn malformed_datetime_is_none() {
        assert!(parse_feed_datetime(Some("not-a-date")).is_none());
        assert!(parse_feed_datetime(Some("")).is_none());
        assert!(parse_feed_datetime(None).is_none());
    }

    #[test]
    fn parses_compact_datetime_in_campus_time() {
        // 2024-01-15 14:30:00 local = 19:30:00 UTC at -5
        let dt = parse_compact_local_datetime(20_240_115_143_000).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 19, 30, 0).unwrap());
    }

    #[test]
    fn short_compact_value_fails_soft() {
        // A truncated 13-digit blob is zero-padded before slicing; the
        // resulting components fall out of range and parsing yields None
        // instead of panicking on a bad slice boundary.
        assert!(parse_compact_local_datetime(2_024_011_514_300).is_none());
    }

    #[test]
    fn rejects_non_positive_compact() {
        assert!(parse_compact_local_datetime(0).is_none());
        assert!(parse_compact_local_datetime(-5).is_none());
    }

    #[test]
    fn rejects_out_of_range_compact() {
        // Month 13
        assert!(parse_compact_local_datetime(20_241_315_143_000).is_none());
    }

    #[test]
    fn non_empty_str_filters_blanks() {
        let v = serde_json::json!("  ");
        assert!(non_empty_str(Some(&v)).is_none());
        let v = serde_json::json!("Main Hall");
        assert_eq!(non_empty_str(Some(&v)), Some("Main Hall"));
        assert!(non_empty_str(None).is_none());
    }
}
