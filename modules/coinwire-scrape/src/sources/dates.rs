//! Best-effort publication-date parsing. Every helper returns `None` on
//! failure; an unparseable date leaves `pub_date` null rather than failing
//! the record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts <= 0 {
        return None;
    }
    Utc.timestamp_opt(ts, 0).single()
}

pub fn rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse a naive datetime with the given strftime format, assumed UTC.
pub fn naive(fmt: &str, s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), fmt)
        .ok()
        .map(|d| d.and_utc())
}

/// Parse a bare date with the given strftime format, midnight UTC.
pub fn naive_date(fmt: &str, s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s.trim(), fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Strip a trailing timezone abbreviation ("... 10:30 AM EST" → "... 10:30 AM")
/// so site timestamps parse with naive formats.
pub fn strip_tz_suffix(s: &str) -> &str {
    let trimmed = s.trim();
    match trimmed.rsplit_once(' ') {
        Some((head, tail))
            if (3..=4).contains(&tail.len())
                && tail.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            head.trim_end()
        }
        _ => trimmed,
    }
}

/// Parse either an absolute "January 02, 2026" date or a relative
/// "3 hours ago" phrase against `now`.
pub fn relative(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(date) = naive_date("%B %d, %Y", s) {
        return Some(date);
    }

    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 || parts[2] != "ago" {
        return None;
    }

    let value: i64 = parts[0].parse().ok()?;
    match parts[1] {
        "second" | "seconds" => Some(now - chrono::Duration::seconds(value)),
        "minute" | "minutes" => Some(now - chrono::Duration::minutes(value)),
        "hour" | "hours" => Some(now - chrono::Duration::hours(value)),
        "day" | "days" => Some(now - chrono::Duration::days(value)),
        "week" | "weeks" => Some(now - chrono::Duration::weeks(value)),
        "month" | "months" => Some(now - chrono::Duration::days(30 * value)),
        "year" | "years" => Some(now - chrono::Duration::days(365 * value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamps_round_trip() {
        let parsed = from_unix(1722470400).unwrap();
        assert_eq!(parsed.timestamp(), 1722470400);
        assert!(from_unix(0).is_none());
    }

    #[test]
    fn relative_phrases_subtract_from_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap();
        let three_hours = relative("3 hours ago", now).unwrap();
        assert_eq!((now - three_hours).num_hours(), 3);

        let two_days = relative("2 days ago", now).unwrap();
        assert_eq!((now - two_days).num_days(), 2);
    }

    #[test]
    fn relative_accepts_absolute_dates() {
        let now = Utc::now();
        let parsed = relative("January 02, 2026", now).unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2026-01-02");
    }

    #[test]
    fn garbage_dates_are_none() {
        let now = Utc::now();
        assert!(relative("yesterday-ish", now).is_none());
        assert!(relative("", now).is_none());
        assert!(rfc3339("not a date").is_none());
    }

    #[test]
    fn tz_suffix_is_stripped() {
        assert_eq!(
            strip_tz_suffix("Jan 02, 2026 at 10:30 AM EST"),
            "Jan 02, 2026 at 10:30 AM"
        );
        assert_eq!(strip_tz_suffix("Jan 02, 2026 at 10:30 AM"), "Jan 02, 2026 at 10:30 AM");
    }
}
