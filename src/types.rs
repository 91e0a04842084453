//! Common types shared across the pipeline
//!
//! City identity, the enumerations that drive configuration (units, formats,
//! layouts, backoff) and the run timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

// ============================================================================
// City Identity
// ============================================================================

/// A configured city: display name plus ISO 3166 country code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CityId {
    /// City name as configured (e.g. "London")
    pub name: String,
    /// Two-letter country code (e.g. "GB")
    pub country: String,
}

impl CityId {
    /// Create a city id; the country code is upper-cased
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            country: country.into().trim().to_uppercase(),
        }
    }

    /// Query form expected by the weather API ("London,GB")
    pub fn query(&self) -> String {
        format!("{},{}", self.name, self.country)
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.country, self.name)
    }
}

// ============================================================================
// Unit System
// ============================================================================

/// Measurement system requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// Celsius, m/s
    #[default]
    Metric,
    /// Fahrenheit, mph
    Imperial,
    /// Kelvin, m/s
    Default,
}

impl UnitSystem {
    /// Value of the `units` query parameter
    pub fn api_param(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Default => "standard",
        }
    }

    /// Suffix for temperature columns
    pub fn temperature_suffix(self) -> &'static str {
        match self {
            Self::Metric => "c",
            Self::Imperial => "f",
            Self::Default => "k",
        }
    }

    /// Suffix for wind speed columns
    pub fn wind_speed_suffix(self) -> &'static str {
        match self {
            Self::Metric | Self::Default => "m_s",
            Self::Imperial => "mph",
        }
    }

    /// Name as written in configuration and in the `units` column
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Default => "default",
        }
    }

    /// Parse the configuration name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "metric" => Some(Self::Metric),
            "imperial" => Some(Self::Imperial),
            "default" => Some(Self::Default),
            _ => None,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Output Format
// ============================================================================

/// File format of the materialized dataset
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited text with a header row
    Csv,
    /// One JSON object per line
    Json,
    /// Columnar Parquet
    #[default]
    Parquet,
}

impl OutputFormat {
    /// File extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Partition Layout
// ============================================================================

/// Directory ordering strategy for the output dataset
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PartitionLayout {
    /// year/month/day
    Date,
    /// year/month/day/country
    DateCountry,
    /// country/year/month/day
    CountryDate,
    /// year/month/day/country/city
    #[default]
    HiveCompact,
    /// city/year/month/day
    CityDate,
}

impl PartitionLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::DateCountry => "date_country",
            Self::CountryDate => "country_date",
            Self::HiveCompact => "hive_compact",
            Self::CityDate => "city_date",
        }
    }
}

impl fmt::Display for PartitionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How directory segments are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStyle {
    /// Values only: `2026/02/07/GB`
    #[default]
    Plain,
    /// Key-value pairs: `year=2026/month=02/day=07/country=GB`
    Hive,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    #[default]
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    Exponential,
}

// ============================================================================
// Run Timestamp
// ============================================================================

/// Text form used in file names
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

static LAST_ISSUED_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Instant a run started; shared by every artifact of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunTimestamp(DateTime<Utc>);

impl RunTimestamp {
    /// Capture the current instant
    ///
    /// Successive calls within one process are strictly increasing, even when
    /// the wall clock has not advanced by a full microsecond.
    pub fn now() -> Self {
        let now = Utc::now().timestamp_micros();
        let previous = LAST_ISSUED_MICROS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        Self::from_micros(now.max(previous.saturating_add(1)))
    }

    /// Wrap an explicit instant, truncated to microseconds
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_micros(at.timestamp_micros())
    }

    fn from_micros(micros: i64) -> Self {
        Self(DateTime::from_timestamp_micros(micros).unwrap_or_default())
    }

    /// The instant itself
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Filename stem shared by every file of the run
    pub fn file_stem(&self) -> String {
        format!("weather_{self}")
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RUN_TIMESTAMP_FORMAT))
    }
}

impl Serialize for RunTimestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
