//! Lenient timestamp parsing for meter exports.
//!
//! Exports from different metering systems disagree on date layout, so each
//! cell is tried against a fixed list of formats. Offsets are accepted but
//! discarded: the wall-clock reading is what gets bucketed. Results outside
//! the range a signed 64-bit nanosecond count can hold (roughly 1677-09-21 to
//! 2262-04-11) are rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Compact `YYYYMMDD` dates, tried before the epoch fallback.
const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_any(s).filter(in_range)
}

fn parse_any(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    if let Some(ts) = parse_naive(s) {
        return Some(ts);
    }
    // UTC designator on a layout the offset formats don't cover
    if let Some(ts) = s.strip_suffix(['Z', 'z']).and_then(parse_naive_datetime) {
        return Some(ts);
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        if s.len() == 8 {
            if let Ok(day) = NaiveDate::parse_from_str(s, COMPACT_DATE_FORMAT) {
                return day.and_hms_opt(0, 0, 0);
            }
        }
        // Other bare integers are Unix epoch seconds.
        let secs: i64 = s.parse().ok()?;
        return DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }

    None
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    parse_naive_datetime(s).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .and_then(|day| day.and_hms_opt(0, 0, 0))
    })
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn in_range(ts: &NaiveDateTime) -> bool {
    let min = DateTime::<Utc>::from_timestamp_nanos(i64::MIN).naive_utc();
    let max = DateTime::<Utc>::from_timestamp_nanos(i64::MAX).naive_utc();
    (min..=max).contains(ts)
}
