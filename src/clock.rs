//! Wall-clock helpers and the cell text formats used in the ledger file.
//!
//! Timestamps are local wall-clock values with second precision, stored as
//! `YYYY-MM-DD HH:MM:SS`. Dates are stored as `YYYY-MM-DD`.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

/// Cell format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cell format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds.
///
/// Everything written to the ledger is second precision, so values produced
/// here compare equal to what a later read parses back.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Today's local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp cell. A bare date is accepted and means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(at);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .map(start_of_day)
}

/// Parse a date cell. A full timestamp is accepted and its date part kept.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(raw).map(|at| at.date()))
}

/// Parse user input as a timestamp, rejecting anything unparseable.
pub fn parse_timestamp_arg(raw: &str) -> Result<NaiveDateTime> {
    parse_timestamp(raw).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "invalid timestamp '{raw}': expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD"
        ))
    })
}

/// Parse user input as a date, rejecting anything unparseable.
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        Error::InvalidArgument(format!("invalid date '{raw}': expected YYYY-MM-DD"))
    })
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn timestamp_accepts_both_formats() {
        assert_eq!(
            parse_timestamp("2025-01-05 09:30:15"),
            Some(ts("2025-01-05 09:30:15"))
        );
        assert_eq!(
            parse_timestamp(" 2025-01-05 "),
            Some(ts("2025-01-05 00:00:00"))
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn date_accepts_timestamp_cells() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 5);
        assert_eq!(parse_date("2025-01-05"), expected);
        assert_eq!(parse_date("2025-01-05 23:59:59"), expected);
        assert_eq!(parse_date("05/01/2025"), None);
    }

    #[test]
    fn formats_match_cell_layout() {
        let at = ts("2025-01-05 07:08:09");
        assert_eq!(format_timestamp(at), "2025-01-05 07:08:09");
        assert_eq!(format_date(at.date()), "2025-01-05");
    }

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(now().nanosecond(), 0);
    }

    #[test]
    fn bad_arguments_are_user_errors() {
        assert!(matches!(
            parse_timestamp_arg("noon"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_date_arg("2025-13-01"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
