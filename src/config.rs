//! Configuration for the analytics library.
//!
//! Defaults for the query builder, SQL renderer, validator, and densifier.
//! Stored as TOML at `~/.config/analytics-core/config.toml` (or XDG
//! equivalent). Every key is optional.
//!
//! # Example Configuration
//!
//! ```toml
//! [query]
//! default_table = "search_queries"
//! default_limit = 50
//! max_limit = 5000
//!
//! [series]
//! granularity = "hour"
//! lookback_days = 2
//! timestamp_field = "time_stamp"
//! value_field = "count"
//! fill = 0.0
//! on_malformed = "abort"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analytics::densify::MalformedRowPolicy;
use crate::analytics::query::TableName;
use crate::analytics::types::Granularity;

/// Errors that can occur when loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub query: QueryConfig,
    pub series: SeriesConfig,
}

/// Query builder and renderer defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Table a fresh builder selects from.
    pub default_table: TableName,
    /// LIMIT rendered when a query sets none. `None` renders no LIMIT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u64>,
    /// Largest LIMIT the validator accepts.
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_table: TableName::Events,
            default_limit: Some(20),
            max_limit: 10_000,
        }
    }
}

/// Largest accepted `series.lookback_days` (ten years).
pub const MAX_LOOKBACK_DAYS: u32 = 3_660;

/// Densifier defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub granularity: Granularity,
    /// Range start when the request omits `gte`, in days before now.
    pub lookback_days: u32,
    /// Row key holding the naive timestamp.
    pub timestamp_field: String,
    /// Row key holding the numeric value.
    pub value_field: String,
    /// Value for buckets no row landed in.
    pub fill: f64,
    /// Fill empty buckets with `null` instead of [`Self::fill`].
    pub fill_with_null: bool,
    pub on_malformed: MalformedRowPolicy,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            lookback_days: 7,
            timestamp_field: "time_stamp".into(),
            value_field: "count".into(),
            fill: 0.0,
            fill_with_null: false,
            on_malformed: MalformedRowPolicy::Skip,
        }
    }
}

impl SeriesConfig {
    /// Effective fill value.
    pub fn fill_value(&self) -> Option<f64> {
        (!self.fill_with_null).then_some(self.fill)
    }
}

impl AnalyticsConfig {
    /// Load from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load from `path`, falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "using default analytics config");
                Self::default()
            }
        }
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        // XDG_CONFIG_HOME wins over the platform default.
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config)
                .join("analytics-core")
                .join("config.toml"));
        }

        dirs::config_dir()
            .map(|p| p.join("analytics-core").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.max_limit == 0 {
            return Err(ConfigError::Validation(
                "query.max_limit must be at least 1".into(),
            ));
        }
        if let Some(limit) = self.query.default_limit
            && (limit == 0 || limit > self.query.max_limit)
        {
            return Err(ConfigError::Validation(format!(
                "query.default_limit {limit} is outside 1..={}",
                self.query.max_limit
            )));
        }
        if self.series.timestamp_field.is_empty() || self.series.value_field.is_empty() {
            return Err(ConfigError::Validation(
                "series field names cannot be empty".into(),
            ));
        }
        if self.series.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Validation(format!(
                "series.lookback_days {} exceeds {MAX_LOOKBACK_DAYS}",
                self.series.lookback_days
            )));
        }
        if !self.series.fill.is_finite() {
            return Err(ConfigError::Validation(
                "series.fill must be a finite number".into(),
            ));
        }
        Ok(())
    }
}
