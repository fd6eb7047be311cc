//! Timestamp helpers shared by both stores.
//!
//! Timestamps are stored as RFC 3339 text in UTC with whole seconds, so string
//! comparison in SQL matches chronological order.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[must_use]
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn from_db(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {raw}"))
}

/// Start of the given day in UTC.
#[must_use]
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Parses the value of an `<input type="datetime-local">` (minute precision,
/// interpreted as UTC).
#[must_use]
pub fn parse_local_minutes(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M")
        .ok()
        .map(|ts| ts.and_utc())
}

#[must_use]
pub fn format_minutes(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_roundtrip_keeps_second_precision() {
        let ts = now();
        let stored = to_db(&ts);
        assert!(stored.ends_with('Z'));
        assert_eq!(from_db(&stored).unwrap(), ts);
    }

    #[test]
    fn test_stored_order_is_chronological() {
        let earlier = from_db("2024-03-09T23:59:59Z").unwrap();
        let later = from_db("2024-03-10T00:00:00Z").unwrap();
        assert!(to_db(&earlier) < to_db(&later));
    }

    #[test]
    fn test_parse_local_minutes() {
        let ts = parse_local_minutes("2024-05-01T08:30").unwrap();
        assert_eq!(to_db(&ts), "2024-05-01T08:30:00Z");
        assert!(parse_local_minutes("yesterday").is_none());
        assert!(parse_local_minutes("").is_none());
    }
}
