//! Due-date parsing.
//!
//! The service sends due dates in three shapes:
//! - full-day dates: `YYYY-MM-DD`
//! - floating dates: `YYYY-MM-DDTHH:MM:SS`, interpreted in the local timezone
//! - fixed dates: RFC 3339 with an offset, e.g. `YYYY-MM-DDTHH:MM:SSZ`

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

const DATE_LAYOUT: &str = "%Y-%m-%d";
const DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("Unrecognized date: {0}")]
    Format(String),
    #[error("Local time does not exist: {0}")]
    Nonexistent(String),
}

pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, TimeError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_LAYOUT) {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TimeError::Format(value.to_string()))?;
        return local_to_utc(midnight, value);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, DATETIME_LAYOUT) {
        return local_to_utc(naive, value);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| TimeError::Format(value.to_string()))
}

pub fn is_full_day(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), DATE_LAYOUT).is_ok()
}

/// Last second of today in local time.
pub fn end_of_today() -> DateTime<Utc> {
    end_of_local_day(Local::now().date_naive())
}

/// Last second of the sixth day after today; "today plus the next 6 days".
pub fn end_of_next_7_days() -> DateTime<Utc> {
    end_of_local_day(Local::now().date_naive() + Duration::days(6))
}

fn end_of_local_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .and_then(|naive| Local.from_local_datetime(&naive).latest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn local_to_utc(naive: NaiveDateTime, raw: &str) -> Result<DateTime<Utc>, TimeError> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| TimeError::Nonexistent(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_dates_as_utc() {
        let parsed = parse_due_date("2014-09-26T08:25:05Z").expect("rfc3339");
        assert_eq!(parsed.to_rfc3339(), "2014-09-26T08:25:05+00:00");
    }

    #[test]
    fn parses_floating_and_full_day_dates_in_local_time() {
        let floating = parse_due_date("2014-09-26T08:25:05").expect("floating");
        assert_eq!(
            floating.with_timezone(&Local).naive_local(),
            NaiveDate::from_ymd_opt(2014, 9, 26)
                .and_then(|d| d.and_hms_opt(8, 25, 5))
                .expect("naive")
        );
        let full_day = parse_due_date("2014-09-26").expect("date");
        assert_eq!(
            full_day.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2014, 9, 26).expect("date")
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(
            parse_due_date("Fri 26 Sep 2014"),
            Err(TimeError::Format(_))
        ));
    }

    #[test]
    fn full_day_detection() {
        assert!(is_full_day("2014-09-26"));
        assert!(!is_full_day("2014-09-26T08:25:05"));
    }

    #[test]
    fn next_7_days_is_after_today() {
        assert!(end_of_next_7_days() > end_of_today());
    }
}
