//! Calendar-day keys for check-ins, streaks, and prompt markers
//!
//! The durable store keys everything by UTC calendar day ("YYYY-MM-DD").
//! Client-local days exist only in the advisory marker layer; the
//! `(user_id, checkin_date)` primary key always holds a UTC day, so the
//! two reckonings can disagree near midnight without risking a double
//! grant (see DESIGN.md).

use chrono::{NaiveDate, Utc};

/// Format a calendar day as the canonical "YYYY-MM-DD" key.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a canonical "YYYY-MM-DD" key back into a day.
pub fn parse_day(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Today's calendar day under the authoritative (UTC) policy.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Marker key for "user claimed their daily bonus on `day`".
pub fn claimed_key(user_id: &str, day: NaiveDate) -> String {
    format!("claimed:{}:{}", user_id, format_day(day))
}

/// Marker key for "user dismissed the daily prompt on `day`".
pub fn dismissed_key(user_id: &str, day: NaiveDate) -> String {
    format!("dismissed:{}:{}", user_id, format_day(day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_roundtrip() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let key = format_day(day);
        assert_eq!(key, "2025-03-09");
        assert_eq!(parse_day(&key), Some(day));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_day("not-a-day"), None);
        assert_eq!(parse_day("2025-13-40"), None);
        assert_eq!(parse_day(""), None);
    }

    #[test]
    fn test_marker_keys_share_day_function() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(claimed_key("u1", day), "claimed:u1:2025-03-09");
        assert_eq!(dismissed_key("u1", day), "dismissed:u1:2025-03-09");
    }
}
