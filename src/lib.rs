//! Analytics query IR builder and gap-filled time-series densifier.
//!
//! [`AnalyticsQueryBuilder`] assembles an [`AnalyticsQuery`] that serializes
//! to the JSON contract of the remote analytics store. [`Densifier`] turns
//! the store's sparse time-series rows into one bucket per calendar unit.

pub mod analytics;
pub mod config;

pub use analytics::*;
pub use config::{AnalyticsConfig, ConfigError, QueryConfig, SeriesConfig};
