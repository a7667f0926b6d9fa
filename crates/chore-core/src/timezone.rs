use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone)
        .map_err(|_| CoreError::InvalidTimezone(format!("Invalid timezone: {}", timezone)))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// Calendar date of `at` as seen on a wall clock in `tz`.
///
/// This is the only place instants become calendar dates; never use the
/// server's local zone for "today".
pub fn local_date(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Wall-clock time of `at` in `tz`.
pub fn local_time(tz: Tz, at: DateTime<Utc>) -> NaiveTime {
    at.with_timezone(&tz).time()
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(
    datetime: DateTime<Utc>,
    timezone: &str,
    format: &str,
) -> Result<String, CoreError> {
    let tz = parse_timezone(timezone)?;
    Ok(datetime.with_timezone(&tz).format(format).to_string())
}
