//! Birth-date plumbing. Dates live everywhere as plain `YYYY-MM-DD` strings;
//! whenever arithmetic or comparison needs an instant, the date is pinned to
//! UTC noon. Parsing a bare date as local midnight shifts it across a day
//! boundary in western timezones, which is exactly the bug this avoids.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{AppError, Result};

/// Strict `YYYY-MM-DD` parse.
pub fn parse_ymd(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

/// Pin a calendar date to 12:00:00.000 UTC.
pub fn utc_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon).and_utc()
}

/// Parse a `YYYY-MM-DD` string and pin it to UTC noon.
pub fn ymd_to_utc_noon(s: &str) -> Result<DateTime<Utc>> {
    Ok(utc_noon(parse_ymd(s)?))
}

/// Epoch milliseconds at UTC noon — the instant representation used by the
/// ranking normalization.
pub fn ymd_to_noon_millis(s: &str) -> Result<f64> {
    Ok(ymd_to_utc_noon(s)?.timestamp_millis() as f64)
}

pub fn noon_millis(date: NaiveDate) -> f64 {
    utc_noon(date).timestamp_millis() as f64
}

/// Calendar-day arithmetic on a `YYYY-MM-DD` string.
pub fn add_days(s: &str, days: i64) -> Result<String> {
    let date = parse_ymd(s)? + Duration::days(days);
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Signed whole-day offset of `guess` from `due` (positive = after due date).
pub fn day_offset(guess: NaiveDate, due: NaiveDate) -> i64 {
    (guess - due).num_days()
}

/// RFC3339 with milliseconds, e.g. `2025-12-09T12:00:00.000Z`.
pub fn format_iso_millis(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ymd_pins_to_utc_noon() {
        let dt = ymd_to_utc_noon("2025-12-09").unwrap();
        assert_eq!(format_iso_millis(dt), "2025-12-09T12:00:00.000Z");
    }

    #[test]
    fn add_days_rolls_over_year() {
        assert_eq!(add_days("2025-12-31", 1).unwrap(), "2026-01-01");
    }

    #[test]
    fn add_days_backwards_across_month() {
        assert_eq!(add_days("2025-03-01", -1).unwrap(), "2025-02-28");
    }

    #[test]
    fn add_days_handles_leap_year() {
        assert_eq!(add_days("2024-03-01", -1).unwrap(), "2024-02-29");
    }

    #[test]
    fn day_offset_signed() {
        let due = parse_ymd("2025-12-07").unwrap();
        let early = parse_ymd("2025-12-02").unwrap();
        let late = parse_ymd("2025-12-10").unwrap();
        assert_eq!(day_offset(early, due), -5);
        assert_eq!(day_offset(late, due), 3);
        assert_eq!(day_offset(due, due), 0);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_ymd("12/09/2025").is_err());
        assert!(parse_ymd("2025-13-01").is_err());
        assert!(parse_ymd("").is_err());
    }

    #[test]
    fn noon_millis_one_day_apart() {
        let a = ymd_to_noon_millis("2025-12-07").unwrap();
        let b = ymd_to_noon_millis("2025-12-08").unwrap();
        assert_eq!(b - a, 86_400_000.0);
    }
}
