//! Calendar-unit arithmetic for time-series buckets.
//!
//! All units are fixed-length in UTC (minute, hour, day), so flooring and
//! stepping are integer arithmetic on the Unix timestamp. Keys are the
//! number of whole units since the epoch and are what the densifier indexes
//! rows by.

use chrono::{DateTime, TimeDelta, Utc};

use super::types::Granularity;

impl Granularity {
    /// Length of one unit in seconds.
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    /// One unit as a duration.
    pub fn step(self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }

    /// Start of the unit containing `t`.
    pub fn floor(self, t: DateTime<Utc>) -> DateTime<Utc> {
        let rem = t.timestamp().rem_euclid(self.seconds());
        t - TimeDelta::seconds(rem) - TimeDelta::nanoseconds(i64::from(t.timestamp_subsec_nanos()))
    }

    /// Units since the epoch; equal keys mean the same calendar unit.
    pub fn key(self, t: DateTime<Utc>) -> i64 {
        t.timestamp().div_euclid(self.seconds())
    }

    /// Human-readable bucket key (`2024-01-02`, `2024-01-02T13:00Z`,
    /// `2024-01-02T13:07Z`).
    pub fn label(self, t: DateTime<Utc>) -> String {
        let fmt = match self {
            Self::Day => "%Y-%m-%d",
            Self::Hour => "%Y-%m-%dT%H:00Z",
            Self::Minute => "%Y-%m-%dT%H:%MZ",
        };
        t.format(fmt).to_string()
    }
}

/// Unit starts from the floor of `start` through `end`, inclusive.
///
/// Empty when `start > end`. Stops early rather than overflow at the edge
/// of chrono's representable range.
pub fn enumerate_buckets(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
) -> Vec<DateTime<Utc>> {
    if start > end {
        return Vec::new();
    }
    let step = granularity.step();
    let span = (end - start).num_seconds() / granularity.seconds();
    let mut out = Vec::with_capacity(usize::try_from(span).unwrap_or(0).saturating_add(2));

    let mut cursor = Some(granularity.floor(start));
    while let Some(t) = cursor
        && t <= end
    {
        out.push(t);
        cursor = t.checked_add_signed(step);
    }
    out
}

/// Axis tick format for a chart spanning `[start, end]`: clock time for
/// ranges of a day or less, dates otherwise.
pub fn axis_label_format(start: DateTime<Utc>, end: DateTime<Utc>) -> &'static str {
    if end - start <= TimeDelta::days(1) {
        "%H:%M:%S"
    } else {
        "%Y-%m-%d"
    }
}

/// Render `t` as an axis tick for a chart spanning `[start, end]`.
pub fn axis_label(t: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    t.format(axis_label_format(start, end)).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
