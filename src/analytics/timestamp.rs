//! Naive timestamp parsing and formatting.
//!
//! The store emits `YYYY-MM-DD HH:MM:SS[.ffffff]` with no zone designator;
//! those values are UTC. `T` is accepted as the date/time separator too.
//! Fractional seconds are validated and then dropped, so every parsed
//! instant has whole-second precision.

use chrono::{DateTime, NaiveDate, Utc};

use super::types::{AnalyticsError, AnalyticsResult};

/// Format the store expects in date-range filters.
pub const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a naive UTC timestamp.
pub fn parse_naive_timestamp(input: &str) -> AnalyticsResult<DateTime<Utc>> {
    let malformed = |reason: &'static str| AnalyticsError::MalformedTimestamp {
        input: input.to_string(),
        reason,
    };

    let (date, time) = input
        .split_once(' ')
        .or_else(|| input.split_once('T'))
        .ok_or_else(|| malformed("missing date/time separator"))?;

    let [year, month, day] = split_fields(date, '-').ok_or_else(|| malformed("date is not Y-M-D"))?;

    let (clock, fraction) = match time.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time, None),
    };
    let [hour, minute, second] =
        split_fields(clock, ':').ok_or_else(|| malformed("time is not H:M:S"))?;
    if let Some(fraction) = fraction
        && !is_digits(fraction)
    {
        return Err(malformed("fractional seconds are not digits"));
    }

    let date = calendar_date(year, month, day).ok_or_else(|| malformed("calendar date does not exist"))?;
    let naive = date
        .and_hms_opt(hour, minute, second)
        .ok_or_else(|| malformed("time of day does not exist"))?;
    Ok(naive.and_utc())
}

/// Parse a range bound: a full naive timestamp, or a bare `YYYY-MM-DD`
/// meaning midnight UTC.
pub fn parse_range_bound(input: &str) -> AnalyticsResult<DateTime<Utc>> {
    let trimmed = input.trim();
    if !trimmed.contains([' ', 'T']) {
        let [year, month, day] = split_fields(trimmed, '-').ok_or_else(|| {
            AnalyticsError::MalformedTimestamp {
                input: input.to_string(),
                reason: "date is not Y-M-D",
            }
        })?;
        return calendar_date(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| AnalyticsError::MalformedTimestamp {
                input: input.to_string(),
                reason: "calendar date does not exist",
            });
    }
    parse_naive_timestamp(trimmed)
}

/// Render an instant in [`API_TIMESTAMP_FORMAT`].
pub fn format_api_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(API_TIMESTAMP_FORMAT).to_string()
}

fn calendar_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Split `s` into exactly three non-empty digit fields.
fn split_fields(s: &str, sep: char) -> Option<[u32; 3]> {
    let mut parts = s.split(sep);
    let mut out = [0_u32; 3];
    for slot in &mut out {
        let part = parts.next()?;
        if !is_digits(part) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    match parts.next() {
        Some(_) => None,
        None => Some(out),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
