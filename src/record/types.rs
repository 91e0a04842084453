//! Record and payload types

use crate::types::{CityId, UnitSystem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Text form of observation, sunrise and sunset instants
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// One step in a payload path
#[derive(Debug, Clone, Copy)]
pub enum PathKey<'a> {
    /// Object member
    Field(&'a str),
    /// Array element
    Index(usize),
}

/// Untyped payload returned by the weather API for one city
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload(Value);

// -2^63 and 2^63; both exact in f64
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_EXCLUSIVE_F64: f64 = 9_223_372_036_854_775_808.0;

impl RawPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON document
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Walk a nested path; `None` if any step is missing or has the wrong shape
    pub fn get(&self, path: &[PathKey<'_>]) -> Option<&Value> {
        let mut current = &self.0;
        for key in path {
            current = match key {
                PathKey::Field(name) => current.as_object()?.get(*name)?,
                PathKey::Index(i) => current.as_array()?.get(*i)?,
            };
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Numeric value at a path
    pub fn get_f64(&self, path: &[PathKey<'_>]) -> Option<f64> {
        self.get(path)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }

    /// Integral value at a path
    ///
    /// Floats with a fractional part or outside the `i64` range are rejected.
    pub fn get_i64(&self, path: &[PathKey<'_>]) -> Option<i64> {
        let value = self.get(path)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| (I64_MIN_F64..I64_MAX_EXCLUSIVE_F64).contains(f))
                .map(|f| f as i64)
        })
    }

    /// Non-empty string at a path
    pub fn get_str(&self, path: &[PathKey<'_>]) -> Option<&str> {
        self.get(path)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One normalized observation for one city
///
/// `None` marks a value the source did not report. Unit-bearing fields are
/// interpreted in `units`, which is the same for every record of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub observed_at: DateTime<Utc>,
    /// Offset from UTC as `±HH:MM`
    pub utc_offset: String,
    pub weather: Option<String>,
    pub weather_description: Option<String>,
    pub temperature_current: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub temperature_feels_like: Option<f64>,
    /// hPa
    pub pressure: Option<i64>,
    /// Percent
    pub humidity: Option<i64>,
    /// Percent
    pub cloudiness: Option<i64>,
    pub wind_speed: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    /// 16-point compass label
    pub wind_direction: Option<String>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub units: UnitSystem,
}

impl WeatherRecord {
    /// City identity of the record
    pub fn city_id(&self) -> CityId {
        CityId::new(&self.city, &self.country)
    }

    /// Observation instant in its fixed text form
    pub fn timestamp_text(&self) -> String {
        self.observed_at.format(TIMESTAMP_FORMAT).to_string()
    }
}
