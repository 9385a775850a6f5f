use chrono::{DateTime, NaiveDate};

use crate::errors::DateKeyError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a record's date key into a calendar date.
///
/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (reduced to the date in
/// their own offset). Buckets are ordered by this value, never by the raw
/// string.
pub fn parse_date_key(raw: &str) -> Result<NaiveDate, DateKeyError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| DateKeyError {
            raw: raw.to_string(),
        })
}

/// Canonical `YYYY-MM-DD` bucket key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
