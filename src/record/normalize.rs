//! Raw payload to record transformation

use super::compass::{wind_direction_with, SectorBoundary};
use super::types::{PathKey, RawPayload, WeatherRecord};
use crate::error::NormalizationError;
use crate::types::{CityId, UnitSystem};
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::PathKey::{Field, Index};

// Payload paths of the OpenWeather current-weather document
const DT: &[PathKey<'static>] = &[Field("dt")];
const TIMEZONE: &[PathKey<'static>] = &[Field("timezone")];
const NAME: &[PathKey<'static>] = &[Field("name")];
const SYS_COUNTRY: &[PathKey<'static>] = &[Field("sys"), Field("country")];
const SYS_SUNRISE: &[PathKey<'static>] = &[Field("sys"), Field("sunrise")];
const SYS_SUNSET: &[PathKey<'static>] = &[Field("sys"), Field("sunset")];
const WEATHER_MAIN: &[PathKey<'static>] = &[Field("weather"), Index(0), Field("main")];
const WEATHER_DESCRIPTION: &[PathKey<'static>] =
    &[Field("weather"), Index(0), Field("description")];
const MAIN_TEMP: &[PathKey<'static>] = &[Field("main"), Field("temp")];
const MAIN_TEMP_MIN: &[PathKey<'static>] = &[Field("main"), Field("temp_min")];
const MAIN_TEMP_MAX: &[PathKey<'static>] = &[Field("main"), Field("temp_max")];
const MAIN_FEELS_LIKE: &[PathKey<'static>] = &[Field("main"), Field("feels_like")];
const MAIN_PRESSURE: &[PathKey<'static>] = &[Field("main"), Field("pressure")];
const MAIN_HUMIDITY: &[PathKey<'static>] = &[Field("main"), Field("humidity")];
const CLOUDS_ALL: &[PathKey<'static>] = &[Field("clouds"), Field("all")];
const WIND_SPEED: &[PathKey<'static>] = &[Field("wind"), Field("speed")];
const WIND_DEG: &[PathKey<'static>] = &[Field("wind"), Field("deg")];

/// Largest UTC offset accepted, in seconds (±18:00)
const MAX_OFFSET_SECONDS: i64 = 18 * 3600;

/// Normalize a payload with the default compass boundary rule
pub fn normalize(
    city: &CityId,
    raw: &RawPayload,
    units: UnitSystem,
) -> Result<WeatherRecord, NormalizationError> {
    normalize_with(city, raw, units, SectorBoundary::default())
}

/// Normalize a payload into a record
///
/// Only city identity and the observation timestamp are mandatory. Any other
/// field that is missing or has the wrong JSON type becomes `None`.
pub fn normalize_with(
    city: &CityId,
    raw: &RawPayload,
    units: UnitSystem,
    boundary: SectorBoundary,
) -> Result<WeatherRecord, NormalizationError> {
    let name = non_empty(&city.name)
        .or_else(|| raw.get_str(NAME).map(str::trim))
        .ok_or(NormalizationError::MissingCity)?
        .to_string();
    let country = non_empty(&city.country)
        .or_else(|| raw.get_str(SYS_COUNTRY).map(str::trim))
        .ok_or(NormalizationError::MissingCity)?
        .to_uppercase();

    let observed_at = observation_time(raw)?;

    let wind_direction_deg = raw.get_f64(WIND_DEG);
    let wind_direction = wind_direction_deg
        .and_then(|deg| wind_direction_with(deg, boundary))
        .map(str::to_string);

    Ok(WeatherRecord {
        city: name,
        country,
        observed_at,
        utc_offset: format_utc_offset(raw.get_i64(TIMEZONE)),
        weather: raw.get_str(WEATHER_MAIN).map(str::to_string),
        weather_description: raw.get_str(WEATHER_DESCRIPTION).map(str::to_string),
        temperature_current: raw.get_f64(MAIN_TEMP),
        temperature_min: raw.get_f64(MAIN_TEMP_MIN),
        temperature_max: raw.get_f64(MAIN_TEMP_MAX),
        temperature_feels_like: raw.get_f64(MAIN_FEELS_LIKE),
        pressure: raw.get_i64(MAIN_PRESSURE),
        humidity: raw.get_i64(MAIN_HUMIDITY),
        cloudiness: raw.get_i64(CLOUDS_ALL),
        wind_speed: raw.get_f64(WIND_SPEED),
        wind_direction_deg,
        wind_direction,
        sunrise: raw.get_i64(SYS_SUNRISE).and_then(from_unix),
        sunset: raw.get_i64(SYS_SUNSET).and_then(from_unix),
        units,
    })
}

/// Render a signed offset in seconds as `±HH:MM`
///
/// A missing or out-of-range offset renders as `+00:00`.
pub fn format_utc_offset(seconds: Option<i64>) -> String {
    let seconds = seconds
        .filter(|s| (-MAX_OFFSET_SECONDS..=MAX_OFFSET_SECONDS).contains(s))
        .unwrap_or(0);
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

fn observation_time(raw: &RawPayload) -> Result<DateTime<Utc>, NormalizationError> {
    let value = raw.get(DT).ok_or(NormalizationError::MissingTimestamp)?;
    raw.get_i64(DT)
        .and_then(from_unix)
        .ok_or_else(|| NormalizationError::InvalidTimestamp {
            value: render(value),
        })
}

fn from_unix(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
