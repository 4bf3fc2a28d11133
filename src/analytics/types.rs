//! Shared types for the analytics library.
//!
//! The error type, bucket granularity, date ranges, and the dense series
//! output live here so the builder, parser, and densifier agree on them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::format_api_timestamp;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Analytics-specific error.
///
/// Every variant is local and synchronous: it is reported by the call that
/// violated the constraint and never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    /// A column combination the engine cannot express, e.g. `distinct`
    /// without an aggregation.
    #[error("invalid column spec for `{column}`: {reason}")]
    InvalidColumnSpec { column: String, reason: String },

    /// `and` / `or` was handed zero conditions.
    #[error("{combinator} requires at least one condition")]
    EmptyConditionList { combinator: &'static str },

    /// Negative LIMIT or OFFSET.
    #[error("{field} must be non-negative, got {value}")]
    InvalidLimitOffset { field: &'static str, value: i64 },

    /// The input is not a naive `YYYY-MM-DD[ T]HH:mm:ss[.f]` timestamp.
    #[error("malformed timestamp `{input}`: {reason}")]
    MalformedTimestamp { input: String, reason: &'static str },

    /// A filter node would carry both an AND group and an OR group.
    #[error("filter on `{column}` mixes and_filter with or_filter")]
    AmbiguousFilter { column: String },

    /// A table, column, or alias name outside the identifier alphabet.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// A raw SQL fragment containing a denied keyword or statement separator.
    #[error("invalid expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// An open start bound cannot be resolved because `now - lookback`
    /// falls outside the representable time range.
    #[error("lookback of {seconds}s reaches outside the supported time range")]
    LookbackOutOfRange { seconds: i64 },

    /// LIMIT outside the range the engine accepts.
    #[error("limit {value} is outside 1..={max}")]
    LimitOutOfRange { value: u64, max: u64 },
}

/// Convenience alias.
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

// ---------------------------------------------------------------------------
// Granularity
// ---------------------------------------------------------------------------

/// Calendar unit used to bucket a time series.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
    #[default]
    Day,
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(format!(
                "unknown granularity `{other}` (expected day, hour, or minute)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Requested series range, as naive UTC strings in the store's format.
///
/// Either bound may be omitted; the densifier fills it from its clock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

impl DateRange {
    pub fn new(gte: Option<impl Into<String>>, lte: Option<impl Into<String>>) -> Self {
        Self {
            gte: gte.map(Into::into),
            lte: lte.map(Into::into),
        }
    }

    /// Build a range from instants, formatted the way the store expects
    /// date-range filters.
    pub fn from_instants(gte: Option<DateTime<Utc>>, lte: Option<DateTime<Utc>>) -> Self {
        Self {
            gte: gte.map(format_api_timestamp),
            lte: lte.map(format_api_timestamp),
        }
    }

    /// True when neither bound is set.
    pub fn is_open(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

// ---------------------------------------------------------------------------
// Series input rows
// ---------------------------------------------------------------------------

/// A sparse row as returned by the store: naive timestamp plus value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub timestamp: String,
    #[serde(default)]
    pub value: Option<f64>,
}

impl SeriesRow {
    pub fn new(timestamp: impl Into<String>, value: impl Into<Option<f64>>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dense output
// ---------------------------------------------------------------------------

/// One calendar unit of a dense series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// Start of the calendar unit, UTC.
    pub time: DateTime<Utc>,
    /// Matched row value, or the fill value when no row landed here.
    pub value: Option<f64>,
}

/// Result of a densify pass, with row accounting for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DensifyReport {
    /// Ascending, gap-free buckets covering the resolved range.
    pub buckets: Vec<TimeBucket>,
    /// Granularity that was used.
    pub granularity: Granularity,
    /// Buckets that received a row value.
    pub matched_buckets: usize,
    /// Rows dropped because their timestamp was missing or malformed.
    pub skipped_rows: usize,
    /// Rows ignored because an earlier row already claimed the same unit.
    pub duplicate_rows: usize,
}

impl DensifyReport {
    /// Produce the chart-facing JSON envelope.
    pub fn to_json(&self) -> serde_json::Value {
        let points: Vec<serde_json::Value> = self
            .buckets
            .iter()
            .map(|b| {
                serde_json::json!({
                    "time": b.time.to_rfc3339_opts(SecondsFormat::Secs, true),
                    "value": b.value,
                })
            })
            .collect();

        serde_json::json!({
            "points": points,
            "bucket_count": self.buckets.len(),
            "_meta": {
                "granularity": self.granularity.to_string(),
                "matched_buckets": self.matched_buckets,
                "skipped_rows": self.skipped_rows,
                "duplicate_rows": self.duplicate_rows,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn granularity_display_and_parse() {
        for g in [Granularity::Minute, Granularity::Hour, Granularity::Day] {
            assert_eq!(g.to_string().parse::<Granularity>(), Ok(g));
        }
        assert_eq!(" HOUR ".parse::<Granularity>(), Ok(Granularity::Hour));
        assert!("week".parse::<Granularity>().is_err());
    }

    #[test]
    fn granularity_serializes_lowercase() {
        let json = serde_json::to_string(&Granularity::Minute).unwrap();
        assert_eq!(json, "\"minute\"");
    }

    #[test]
    fn date_range_from_instants_uses_store_format() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let range = DateRange::from_instants(Some(start), None);
        assert_eq!(range.gte.as_deref(), Some("2024-01-01 00:00:00"));
        assert!(range.lte.is_none());
        assert!(!range.is_open());
        assert!(DateRange::default().is_open());
    }

    #[test]
    fn date_range_omits_missing_bounds_in_json() {
        let range = DateRange::new(Some("2024-01-01"), None::<String>);
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json, serde_json::json!({ "gte": "2024-01-01" }));
    }

    #[test]
    fn report_json_shape() {
        let report = DensifyReport {
            buckets: vec![TimeBucket {
                time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                value: None,
            }],
            granularity: Granularity::Day,
            matched_buckets: 0,
            skipped_rows: 1,
            duplicate_rows: 0,
        };
        let json = report.to_json();
        assert_eq!(json["bucket_count"], 1);
        assert_eq!(json["points"][0]["time"], "2024-01-02T00:00:00Z");
        assert!(json["points"][0]["value"].is_null());
        assert_eq!(json["_meta"]["granularity"], "day");
        assert_eq!(json["_meta"]["skipped_rows"], 1);
    }

    #[test]
    fn error_messages_name_the_offender() {
        let err = AnalyticsError::InvalidLimitOffset {
            field: "offset",
            value: -3,
        };
        assert_eq!(err.to_string(), "offset must be non-negative, got -3");
        let err = AnalyticsError::EmptyConditionList { combinator: "or" };
        assert_eq!(err.to_string(), "or requires at least one condition");
    }
}
