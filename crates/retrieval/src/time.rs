//! Time expression resolution.
//!
//! Turns the tokens a caller passes to `retrieve_interaction` into absolute
//! nanosecond timestamps. A token is one of:
//!
//! - a run of decimal digits, taken as nanoseconds since the epoch as-is
//! - `yesterday`, `today` or `tomorrow` (case-insensitive)
//! - a calendar date in `YYYY-MM-DD` form
//!
//! Dates resolve to the first instant of the day for the start of a range and
//! to 23:59:59.999999 for the end of one, in the host's local time zone.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chronolog_common::{ChronologError, Result};

/// Resolve `token` against the current local time.
pub fn resolve(token: &str, is_end_of_range: bool) -> Result<String> {
    resolve_at(token, is_end_of_range, &Local::now())
}

/// Resolve `token` relative to `now`, using `now`'s time zone for day
/// boundaries.
pub fn resolve_at<Tz: TimeZone>(
    token: &str,
    is_end_of_range: bool,
    now: &DateTime<Tz>,
) -> Result<String> {
    let trimmed = token.trim();
    if is_nanos(trimmed) {
        return Ok(trimmed.to_string());
    }

    let date = resolve_date(trimmed, now.date_naive())
        .ok_or_else(|| ChronologError::InvalidTimeExpression(token.to_string()))?;

    let nanos = day_boundary_nanos(date, is_end_of_range, &now.timezone())
        .ok_or_else(|| ChronologError::InvalidTimeExpression(token.to_string()))?;

    Ok(nanos.to_string())
}

fn is_nanos(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn resolve_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    match token.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => today.pred_opt(),
        "tomorrow" => today.succ_opt(),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    }
}

fn day_boundary_nanos<Tz: TimeZone>(date: NaiveDate, end_of_day: bool, tz: &Tz) -> Option<i64> {
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    let local = to_zoned(date.and_time(time), tz)?;
    local.timestamp_nanos_opt().filter(|nanos| *nanos >= 0)
}

// Midnight can fall in a DST gap; step forward until the wall clock exists.
fn to_zoned<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Inclusive query bounds in nanoseconds. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start_nanos: Option<u64>,
    pub end_nanos: Option<u64>,
}

impl TimeRange {
    pub fn new(start_nanos: Option<u64>, end_nanos: Option<u64>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start_nanos, end_nanos) {
            if start > end {
                return Err(ChronologError::InvalidTimeRange { start, end });
            }
        }
        Ok(Self {
            start_nanos,
            end_nanos,
        })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a range from optional textual tokens, resolved against local time.
    pub fn from_tokens(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Self::from_tokens_at(start, end, &Local::now())
    }

    pub fn from_tokens_at<Tz: TimeZone>(
        start: Option<&str>,
        end: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<Self> {
        let start_nanos = start.map(|t| bound(t, false, now)).transpose()?;
        let end_nanos = end.map(|t| bound(t, true, now)).transpose()?;
        Self::new(start_nanos, end_nanos)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_nanos.is_none() && self.end_nanos.is_none()
    }
}

fn bound<Tz: TimeZone>(token: &str, is_end: bool, now: &DateTime<Tz>) -> Result<u64> {
    resolve_at(token, is_end, now)?
        .parse::<u64>()
        .map_err(|_| ChronologError::InvalidTimeExpression(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn noon(date: &str) -> DateTime<Utc> {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
    }

    fn nanos(s: &str) -> i64 {
        s.parse().unwrap()
    }

    #[test]
    fn test_digits_pass_through() {
        let now = noon("2025-05-06");
        for token in ["0", "1732752000000000000", "0042"] {
            assert_eq!(resolve_at(token, false, &now).unwrap(), token);
            assert_eq!(resolve_at(token, true, &now).unwrap(), token);
        }
    }

    #[test]
    fn test_date_boundaries() {
        let now = noon("2025-05-06");
        let start = nanos(&resolve_at("2024-11-28", false, &now).unwrap());
        let end = nanos(&resolve_at("2024-11-28", true, &now).unwrap());

        assert_eq!(start, 1_732_752_000_000_000_000);
        assert_eq!(end, 1_732_752_000_000_000_000 + 86_400_000_000_000 - 1_000);
        assert!(start < end);
    }

    #[test]
    fn test_today_matches_iso_date() {
        let now = noon("2025-05-06");
        assert_eq!(
            resolve_at("today", false, &now).unwrap(),
            resolve_at("2025-05-06", false, &now).unwrap()
        );
        assert_eq!(
            resolve_at("  TODAY ", true, &now).unwrap(),
            resolve_at("2025-05-06", true, &now).unwrap()
        );
    }

    #[test]
    fn test_relative_keywords() {
        let now = noon("2025-03-01");
        assert_eq!(
            resolve_at("Yesterday", false, &now).unwrap(),
            resolve_at("2025-02-28", false, &now).unwrap()
        );
        assert_eq!(
            resolve_at("tomorrow", false, &now).unwrap(),
            resolve_at("2025-03-02", false, &now).unwrap()
        );
    }

    #[test]
    fn test_local_offset_shifts_boundary() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = noon("2024-11-28").with_timezone(&offset);
        let start = nanos(&resolve_at("2024-11-28", false, &now).unwrap());
        assert_eq!(start, 1_732_752_000_000_000_000 - 2 * 3_600_000_000_000);
    }

    #[test]
    fn test_invalid_tokens() {
        let now = noon("2025-05-06");
        for token in ["not-a-date", "", "   ", "2025-13-01", "12abc", "-5", "1969-12-31"] {
            assert!(
                matches!(
                    resolve_at(token, false, &now),
                    Err(ChronologError::InvalidTimeExpression(_))
                ),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_range_from_tokens() {
        let now = noon("2025-05-06");
        let range = TimeRange::from_tokens_at(Some("yesterday"), Some("today"), &now).unwrap();
        assert!(range.start_nanos.unwrap() < range.end_nanos.unwrap());

        let open = TimeRange::from_tokens_at(None, None, &now).unwrap();
        assert!(open.is_unbounded());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let now = noon("2025-05-06");
        let result = TimeRange::from_tokens_at(Some("today"), Some("yesterday"), &now);
        assert!(matches!(result, Err(ChronologError::InvalidTimeRange { .. })));
    }

    #[test]
    fn test_oversized_digits_rejected_as_bound() {
        let now = noon("2025-05-06");
        let result = TimeRange::from_tokens_at(Some("99999999999999999999999"), None, &now);
        assert!(matches!(result, Err(ChronologError::InvalidTimeExpression(_))));
    }
}
