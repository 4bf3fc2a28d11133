//! Analytics query construction and time-series presentation.
//!
//! Builds the structured query description sent to the remote columnar
//! store, and turns the sparse rows it returns into gap-filled series for
//! charting.
//!
//! # Module structure
//!
//! - [`types`]: error type, granularity, date ranges, series rows and buckets
//! - [`filter`]: recursive filter conditions and their wire shape
//! - [`query`]: the `AnalyticsQuery` IR
//! - [`builder`]: immutable fluent builder for the IR
//! - [`validate`]: identifier, fragment, and LIMIT preflight checks
//! - [`sql`]: parameterized SQL rendering of the IR
//! - [`timestamp`]: naive UTC timestamp parsing and formatting
//! - [`bucketing`]: calendar-unit floor, keys, labels, enumeration
//! - [`densify`]: gap-filling densifier with injectable clock

pub mod bucketing;
pub mod builder;
pub mod densify;
pub mod filter;
pub mod query;
pub mod sql;
pub mod timestamp;
pub mod types;
pub mod validate;

// Re-export the most commonly used items at the crate::analytics level.
pub use builder::{AnalyticsQueryBuilder, ColumnOptions};
pub use densify::{
    Clock, Densifier, DensifyOptions, FixedClock, JsonRow, MalformedRowPolicy, SeriesPoint,
    SystemClock,
};
pub use filter::{FilterCondition, FilterOperator, FilterValue, Predicate};
pub use query::{
    AggregationType, AnalyticsQuery, Column, CommonTableExpression, Direction, Expression,
    GroupBy, JoinClause, JoinType, OrderBy, TableName,
};
pub use sql::{QueryParameter, SqlQuery};
pub use timestamp::{format_api_timestamp, parse_naive_timestamp, parse_range_bound};
pub use types::{
    AnalyticsError, AnalyticsResult, DateRange, DensifyReport, Granularity, SeriesRow, TimeBucket,
};
