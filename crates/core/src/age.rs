//! Elapsed-age helper for CRM timestamps.
//!
//! LeadSquared emits timestamps in a handful of shapes depending on the
//! endpoint; everything unparseable is treated as age zero so that no
//! time-based rule can fire on garbage input.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a CRM timestamp into UTC, trying the formats LeadSquared
/// actually emits: RFC 3339, `"%Y-%m-%d %H:%M:%S"`, and a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

/// Whole days elapsed between `now` and `raw` (floor semantics).
///
/// Returns 0 when the input is absent or fails to parse. A future
/// timestamp yields a negative age; no rule threshold can fire on it.
pub fn days_between_at(raw: Option<&str>, now: DateTime<Utc>) -> i64 {
    match raw.and_then(parse_timestamp) {
        Some(ts) => (now - ts).num_days(),
        None => 0,
    }
}

/// [`days_between_at`] against wall-clock time.
pub fn days_between(raw: Option<&str>) -> i64 {
    days_between_at(raw, Utc::now())
}
