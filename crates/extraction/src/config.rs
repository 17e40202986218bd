//! Pipeline configuration loaded from YAML.

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ecohub_common::TimeRange;
use raster::ExtractorConfig;
use reference_store::{ReferenceTables, ResolverConfig};
use serde::{Deserialize, Serialize};
use stac_catalog::DiscoveryConfig;
use thiserror::Error;

/// Collection holding the annual aboveground biomass rasters.
pub const DEFAULT_COLLECTION: &str = "chloris-biomass";

/// What to return when the reference branch fails but the raster branch
/// succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedPolicy {
    /// Fail the request.
    #[default]
    Strict,
    /// Report sentinel labels plus a warning.
    AllowMissingReferences,
}

/// Everything the pipeline needs besides its clients.
///
/// Every field has a default, so a YAML file only lists overrides:
///
/// ```yaml
/// series_range: 2005-01-01/2020-12-31
/// extractor:
///   concurrency: 8
///   empty_clip: abort
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collection: String,
    #[serde(with = "interval")]
    pub snapshot_range: TimeRange,
    #[serde(with = "interval")]
    pub series_range: TimeRange,
    /// Snapshot clip margin in degrees.
    pub buffer_degrees: f64,
    pub degraded: DegradedPolicy,
    pub resolver: ResolverConfig,
    pub tables: ReferenceTables,
    pub discovery: DiscoveryConfig,
    pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            snapshot_range: TimeRange {
                start: utc_date(2015, 6, 30),
                end: utc_date(2019, 7, 30),
            },
            series_range: TimeRange {
                start: utc_date(2002, 1, 1),
                end: utc_date(2020, 12, 31),
            },
            buffer_degrees: aoi::DEFAULT_BUFFER_DEGREES,
            degraded: DegradedPolicy::Strict,
            resolver: ResolverConfig::default(),
            tables: ReferenceTables::default(),
            discovery: DiscoveryConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".into()));
        }
        if !self.buffer_degrees.is_finite() || self.buffer_degrees < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "buffer_degrees must be non-negative, got {}",
                self.buffer_degrees
            )));
        }
        if self.extractor.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "extractor.concurrency must be at least 1".into(),
            ));
        }
        if self.resolver.protected_area_limit == 0 {
            return Err(ConfigError::Invalid(
                "resolver.protected_area_limit must be at least 1".into(),
            ));
        }
        self.tables
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pipeline config: {0}")]
    Invalid(String),
}

fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_default()
}

/// `TimeRange` as an ISO 8601 interval string ("start/end").
mod interval {
    use ecohub_common::TimeRange;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(range: &TimeRange, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(range)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeRange, D::Error> {
        let text = String::deserialize(deserializer)?;
        TimeRange::parse(&text).map_err(serde::de::Error::custom)
    }
}
