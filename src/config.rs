//! Pipeline configuration
//!
//! The YAML document is deserialized into strongly typed structures and then
//! validated as a whole. Enumerated settings (`units`, `format`, `layout`,
//! `backoff`) are serde enums, so an unknown value is rejected while parsing.

use crate::error::{Error, Result};
use crate::record::{SectorBoundary, COMPASS_POINTS};
use crate::types::{BackoffType, CityId, OutputFormat, PartitionLayout, SegmentStyle, UnitSystem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key unless configured otherwise
pub const DEFAULT_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Remote API settings
    pub api: ApiConfig,

    /// Output dataset settings
    pub storage: StorageConfig,

    /// Record normalization settings
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Cities to ingest, in order
    pub cities: Vec<CityId>,
}

// ============================================================================
// API Config
// ============================================================================

/// Remote weather API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Current-weather endpoint URL
    pub endpoint: String,

    /// Unit system for every record of the run
    #[serde(default)]
    pub units: UnitSystem,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Total attempts per city
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Growth of the delay between attempts
    #[serde(default)]
    pub backoff: BackoffType,

    /// Upper bound for the delay in milliseconds
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Maximum number of cities fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Optional request rate limit shared by all workers
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

fn default_concurrency() -> usize {
    4
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl ApiConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Base inter-attempt delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Cap on the inter-attempt delay
    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::config(format!(
                "environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

// ============================================================================
// Storage Config
// ============================================================================

/// Output dataset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// File format
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory layout
    #[serde(default)]
    pub layout: PartitionLayout,

    /// Root directory of the dataset
    pub base_path: PathBuf,

    /// Rendering of directory segments
    #[serde(default)]
    pub segment_style: SegmentStyle,

    /// Partition groups written concurrently
    #[serde(default = "default_write_concurrency")]
    pub write_concurrency: usize,

    /// Token written to CSV cells for absent values
    #[serde(default = "default_csv_null")]
    pub csv_null: String,
}

fn default_write_concurrency() -> usize {
    1
}

fn default_csv_null() -> String {
    "null".to_string()
}

impl StorageConfig {
    /// Storage settings with defaults for everything but the base path
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            format: OutputFormat::default(),
            layout: PartitionLayout::default(),
            base_path: base_path.into(),
            segment_style: SegmentStyle::default(),
            write_concurrency: default_write_concurrency(),
            csv_null: default_csv_null(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: PartitionLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_segment_style(mut self, style: SegmentStyle) -> Self {
        self.segment_style = style;
        self
    }
}

// ============================================================================
// Normalize Config
// ============================================================================

/// Record normalization settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Which sector owns a compass boundary
    #[serde(default)]
    pub compass_boundary: SectorBoundary,
}

/// Why a CSV null token would be mistaken for a written value, if it would
///
/// Numbers and the fixed text vocabularies (compass labels, unit names) are
/// rejected. Free text equal to the token is caught when the file is written.
fn csv_null_conflict(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.parse::<f64>().is_ok() {
        return Some(format!("'{token}' reads as a number"));
    }
    if COMPASS_POINTS.contains(&trimmed) {
        return Some(format!("'{token}' is a wind direction label"));
    }
    if UnitSystem::parse(trimmed).is_some() {
        return Some(format!("'{token}' is a unit system name"));
    }
    None
}

// ============================================================================
// Loading and Validation
// ============================================================================

/// Load and validate a configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!("Config file not found: {}", path.display()))
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Parse and validate a configuration document
pub fn load_config_from_str(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

impl PipelineConfig {
    /// Check every cross-field rule
    pub fn validate(&self) -> Result<()> {
        self.validate_api()?;
        self.validate_storage()?;
        self.validate_cities()
    }

    fn validate_api(&self) -> Result<()> {
        let api = &self.api;

        if api.endpoint.trim().is_empty() {
            return Err(Error::missing_field("api.endpoint"));
        }
        let url = url::Url::parse(&api.endpoint)
            .map_err(|e| Error::invalid_value("api.endpoint", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "api.endpoint",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if api.retry_attempts == 0 {
            return Err(Error::invalid_value("api.retry_attempts", "must be at least 1"));
        }
        if api.concurrency == 0 {
            return Err(Error::invalid_value("api.concurrency", "must be at least 1"));
        }
        if api.timeout_seconds == 0 {
            return Err(Error::invalid_value("api.timeout_seconds", "must be at least 1"));
        }
        if api.max_retry_delay_ms < api.retry_delay_ms {
            return Err(Error::invalid_value(
                "api.max_retry_delay_ms",
                "must not be smaller than api.retry_delay_ms",
            ));
        }
        if api.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "api.requests_per_second",
                "must be at least 1 when set",
            ));
        }
        if api.api_key_env.trim().is_empty() {
            return Err(Error::missing_field("api.api_key_env"));
        }
        Ok(())
    }

    fn validate_storage(&self) -> Result<()> {
        if self.storage.base_path.as_os_str().is_empty() {
            return Err(Error::missing_field("storage.base_path"));
        }
        if self.storage.write_concurrency == 0 {
            return Err(Error::invalid_value(
                "storage.write_concurrency",
                "must be at least 1",
            ));
        }
        if let Some(reason) = csv_null_conflict(&self.storage.csv_null) {
            return Err(Error::invalid_value("storage.csv_null", reason));
        }
        Ok(())
    }

    fn validate_cities(&self) -> Result<()> {
        if self.cities.is_empty() {
            return Err(Error::config("At least one city must be configured"));
        }

        let mut seen = HashSet::new();
        for city in &self.cities {
            if city.name.trim().is_empty() {
                return Err(Error::invalid_value("cities", "city name cannot be empty"));
            }
            let country = city.country.trim();
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::invalid_value(
                    "cities",
                    format!("'{}' has invalid country code '{}'", city.name, city.country),
                ));
            }
            let key = CityId::new(&city.name, &city.country);
            if !seen.insert(key.clone()) {
                return Err(Error::invalid_value(
                    "cities",
                    format!("duplicate city {key}"),
                ));
            }
        }
        Ok(())
    }

    /// Configured cities with canonical casing
    pub fn city_ids(&self) -> Vec<CityId> {
        self.cities
            .iter()
            .map(|c| CityId::new(&c.name, &c.country))
            .collect()
    }
}
