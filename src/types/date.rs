//! Date encoding: milliseconds since the epoch, UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ValueError;

/// Parses an ISO-8601 date or date-time into epoch milliseconds.
///
/// Accepts `2023-02-25`, `2000-03-15T21:34:37.443Z`, offsets such as
/// `+01:00`, and zone-less date-times which are read as UTC.
///
/// # Errors
///
/// Returns `Malformed` when the text is not a valid date.
pub fn parse_date_millis(raw: &[u8]) -> Result<i64, ValueError> {
    let malformed = || ValueError::malformed("date", raw);
    let text = std::str::from_utf8(raw).map_err(|_| malformed())?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| malformed())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(malformed)?;
    Ok(midnight.and_utc().timestamp_millis())
}

/// Formats epoch milliseconds as `yyyy-MM-ddTHH:mm:ss.SSSZ`.
///
/// Returns `None` if the instant is outside the representable range.
#[must_use]
pub fn format_date_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}
