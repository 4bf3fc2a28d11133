//! Gap-filling densifier for sparse time series.
//!
//! Takes the sparse rows a time-series query returns and produces one
//! [`TimeBucket`] per calendar unit in the requested range, ascending, with
//! units that no row landed in set to the fill value.
//!
//! Rows are indexed by calendar-unit key before enumeration, so a pass is
//! O(buckets + rows). When several rows share a unit the first one in input
//! order wins.

use std::collections::hash_map::Entry;

use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SeriesConfig;

use super::bucketing::enumerate_buckets;
use super::timestamp::{parse_naive_timestamp, parse_range_bound};
use super::types::{
    AnalyticsError, AnalyticsResult, DateRange, DensifyReport, Granularity, SeriesRow, TimeBucket,
};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for open-ended ranges.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do with a row whose timestamp is missing or unparsable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Log and drop the row; the rest of the batch is kept.
    #[default]
    Skip,
    /// Fail the whole pass with [`AnalyticsError::MalformedTimestamp`].
    Abort,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DensifyOptions {
    pub granularity: Granularity,
    /// Value for buckets no row landed in. `None` yields `null` points.
    pub fill: Option<f64>,
    /// Distance before now used when the range omits its start.
    pub lookback: TimeDelta,
    pub on_malformed: MalformedRowPolicy,
    /// JSON row key holding the timestamp.
    pub timestamp_field: String,
    /// JSON row key holding the value.
    pub value_field: String,
}

impl Default for DensifyOptions {
    fn default() -> Self {
        Self::from_config(&SeriesConfig::default())
    }
}

impl DensifyOptions {
    pub fn from_config(config: &SeriesConfig) -> Self {
        Self {
            granularity: config.granularity,
            fill: config.fill_value(),
            lookback: TimeDelta::days(i64::from(config.lookback_days)),
            on_malformed: config.on_malformed,
            timestamp_field: config.timestamp_field.clone(),
            value_field: config.value_field.clone(),
        }
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn fill(mut self, fill: Option<f64>) -> Self {
        self.fill = fill;
        self
    }

    pub fn on_malformed(mut self, policy: MalformedRowPolicy) -> Self {
        self.on_malformed = policy;
        self
    }
}

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

/// A sparse input row.
pub trait SeriesPoint {
    /// Raw naive timestamp, `None` when the row has none.
    fn timestamp(&self) -> Option<&str>;
    /// Numeric value; missing or non-numeric values read as `0`.
    fn value(&self) -> f64;
}

impl SeriesPoint for SeriesRow {
    fn timestamp(&self) -> Option<&str> {
        Some(&self.timestamp)
    }

    fn value(&self) -> f64 {
        self.value.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// A JSON object row read through configured field names.
#[derive(Clone, Copy, Debug)]
pub struct JsonRow<'a> {
    row: &'a serde_json::Value,
    timestamp_field: &'a str,
    value_field: &'a str,
}

impl<'a> JsonRow<'a> {
    pub fn new(row: &'a serde_json::Value, timestamp_field: &'a str, value_field: &'a str) -> Self {
        Self {
            row,
            timestamp_field,
            value_field,
        }
    }
}

impl SeriesPoint for JsonRow<'_> {
    fn timestamp(&self) -> Option<&str> {
        self.row.get(self.timestamp_field)?.as_str()
    }

    fn value(&self) -> f64 {
        coerce_value(self.row.get(self.value_field))
    }
}

/// Numbers as-is, numeric strings parsed (64-bit integers arrive quoted),
/// `true` as 1, anything else as 0.
pub fn coerce_value(value: Option<&serde_json::Value>) -> f64 {
    use serde_json::Value;
    let v = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if v.is_finite() { v } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Densifier
// ---------------------------------------------------------------------------

/// Turns sparse rows into a dense, ascending bucket series.
#[derive(Clone, Debug)]
pub struct Densifier<C: Clock = SystemClock> {
    options: DensifyOptions,
    clock: C,
}

impl Densifier<SystemClock> {
    pub fn new(options: DensifyOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }

    pub fn from_config(config: &SeriesConfig) -> Self {
        Self::new(DensifyOptions::from_config(config))
    }
}

impl Default for Densifier<SystemClock> {
    fn default() -> Self {
        Self::new(DensifyOptions::default())
    }
}

impl<C: Clock> Densifier<C> {
    pub fn with_clock(options: DensifyOptions, clock: C) -> Self {
        Self { options, clock }
    }

    pub fn options(&self) -> &DensifyOptions {
        &self.options
    }

    /// Resolve `[start, end]`, filling open bounds from one clock read.
    pub fn resolve_range(&self, range: &DateRange) -> AnalyticsResult<(DateTime<Utc>, DateTime<Utc>)> {
        let now = self.clock.now();
        let start = match &range.gte {
            Some(gte) => parse_range_bound(gte)?,
            None => now.checked_sub_signed(self.options.lookback).ok_or(
                AnalyticsError::LookbackOutOfRange {
                    seconds: self.options.lookback.num_seconds(),
                },
            )?,
        };
        let end = match &range.lte {
            Some(lte) => parse_range_bound(lte)?,
            None => now,
        };
        Ok((start, end))
    }

    /// Dense buckets for `rows` over `range`.
    pub fn densify<P: SeriesPoint>(&self, rows: &[P], range: &DateRange) -> AnalyticsResult<Vec<TimeBucket>> {
        self.densify_report(rows, range).map(|report| report.buckets)
    }

    /// Dense buckets plus row accounting.
    pub fn densify_report<P: SeriesPoint>(
        &self,
        rows: &[P],
        range: &DateRange,
    ) -> AnalyticsResult<DensifyReport> {
        let granularity = self.options.granularity;
        let (start, end) = self.resolve_range(range)?;

        let mut index: FxHashMap<i64, f64> = FxHashMap::default();
        let mut skipped_rows = 0;
        let mut duplicate_rows = 0;

        for (position, row) in rows.iter().enumerate() {
            let parsed = match row.timestamp() {
                Some(raw) => parse_naive_timestamp(raw),
                None => Err(AnalyticsError::MalformedTimestamp {
                    input: String::new(),
                    reason: "row has no timestamp",
                }),
            };
            let instant = match parsed {
                Ok(instant) => instant,
                Err(err) => match self.options.on_malformed {
                    MalformedRowPolicy::Skip => {
                        debug!(position, error = %err, "skipping malformed series row");
                        skipped_rows += 1;
                        continue;
                    }
                    MalformedRowPolicy::Abort => {
                        warn!(position, error = %err, "aborting densify on malformed series row");
                        return Err(err);
                    }
                },
            };
            match index.entry(granularity.key(instant)) {
                Entry::Occupied(_) => duplicate_rows += 1,
                Entry::Vacant(slot) => {
                    slot.insert(row.value());
                }
            }
        }

        let mut matched_buckets = 0;
        let buckets: Vec<TimeBucket> = enumerate_buckets(start, end, granularity)
            .into_iter()
            .map(|time| {
                let value = match index.get(&granularity.key(time)) {
                    Some(&v) => {
                        matched_buckets += 1;
                        Some(v)
                    }
                    None => self.options.fill,
                };
                TimeBucket { time, value }
            })
            .collect();

        debug!(
            %granularity,
            buckets = buckets.len(),
            rows = rows.len(),
            matched_buckets,
            skipped_rows,
            duplicate_rows,
            "densified series"
        );

        Ok(DensifyReport {
            buckets,
            granularity,
            matched_buckets,
            skipped_rows,
            duplicate_rows,
        })
    }

    /// Densify JSON object rows read through the configured field names.
    pub fn densify_json(
        &self,
        rows: &[serde_json::Value],
        range: &DateRange,
    ) -> AnalyticsResult<DensifyReport> {
        let rows: Vec<JsonRow<'_>> = rows
            .iter()
            .map(|row| JsonRow::new(row, &self.options.timestamp_field, &self.options.value_field))
            .collect();
        self.densify_report(&rows, range)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
