//! Tests for the record module

use super::*;
use crate::error::NormalizationError;
use crate::types::{CityId, UnitSystem};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn london_payload() -> RawPayload {
    RawPayload::new(json!({
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
        "main": {
            "temp": 7.5,
            "feels_like": 4.9,
            "temp_min": 6.1,
            "temp_max": 8.8,
            "pressure": 1012,
            "humidity": 81
        },
        "wind": {"speed": 4.6, "deg": 240},
        "clouds": {"all": 75},
        "dt": 1_770_465_600,
        "sys": {"country": "GB", "sunrise": 1_770_449_700, "sunset": 1_770_484_500},
        "timezone": 0,
        "name": "London"
    }))
}

// ============================================================================
// Compass Tests
// ============================================================================

#[test_case(0.0, "N" ; "north")]
#[test_case(11.24, "N" ; "just below first boundary")]
#[test_case(11.25, "NNE" ; "first boundary")]
#[test_case(22.5, "NNE" ; "nne centre")]
#[test_case(45.0, "NE" ; "north east")]
#[test_case(90.0, "E" ; "east")]
#[test_case(135.0, "SE" ; "south east")]
#[test_case(180.0, "S" ; "south")]
#[test_case(240.0, "WSW" ; "west south west")]
#[test_case(270.0, "W" ; "west")]
#[test_case(337.5, "NNW" ; "nnw centre")]
#[test_case(348.74, "NNW" ; "just below last boundary")]
#[test_case(348.75, "N" ; "last boundary wraps to north")]
#[test_case(359.99, "N" ; "almost full circle")]
#[test_case(360.0, "N" ; "full circle")]
fn test_wind_direction(degrees: f64, expected: &str) {
    assert_eq!(wind_direction(degrees), Some(expected));
}

#[test_case(-0.1 ; "negative")]
#[test_case(360.01 ; "beyond full circle")]
#[test_case(f64::NAN ; "nan")]
#[test_case(f64::INFINITY ; "infinite")]
fn test_wind_direction_out_of_range(degrees: f64) {
    assert_eq!(wind_direction(degrees), None);
}

#[test]
fn test_wind_direction_every_degree_is_labelled() {
    for tenth in 0..3600 {
        let degrees = f64::from(tenth) / 10.0;
        let label = wind_direction(degrees).unwrap();
        assert!(COMPASS_POINTS.contains(&label), "{degrees} -> {label}");
    }
}

#[test]
fn test_wind_direction_upper_inclusive() {
    let upper = SectorBoundary::UpperInclusive;
    assert_eq!(wind_direction_with(11.25, upper), Some("N"));
    assert_eq!(wind_direction_with(348.75, upper), Some("NNW"));
    assert_eq!(wind_direction_with(0.0, upper), Some("N"));
    assert_eq!(wind_direction_with(33.75, upper), Some("NNE"));
    assert_eq!(wind_direction_with(33.76, upper), Some("NE"));
}

// ============================================================================
// Offset Tests
// ============================================================================

#[test_case(Some(0), "+00:00" ; "utc")]
#[test_case(Some(3600), "+01:00" ; "cet")]
#[test_case(Some(19_800), "+05:30" ; "india")]
#[test_case(Some(-12_600), "-03:30" ; "newfoundland")]
#[test_case(Some(-36_000), "-10:00" ; "hawaii")]
#[test_case(None, "+00:00" ; "missing")]
#[test_case(Some(100_000), "+00:00" ; "out of range")]
#[test_case(Some(-64_800), "-18:00" ; "lowest accepted")]
#[test_case(Some(i64::MIN), "+00:00" ; "i64 min")]
#[test_case(Some(i64::MAX), "+00:00" ; "i64 max")]
fn test_format_utc_offset(seconds: Option<i64>, expected: &str) {
    assert_eq!(format_utc_offset(seconds), expected);
}

// ============================================================================
// RawPayload Tests
// ============================================================================

#[test]
fn test_raw_payload_paths() {
    let raw = london_payload();
    assert_eq!(
        raw.get_str(&[PathKey::Field("weather"), PathKey::Index(0), PathKey::Field("main")]),
        Some("Clouds")
    );
    assert_eq!(raw.get_i64(&[PathKey::Field("dt")]), Some(1_770_465_600));
    assert_eq!(
        raw.get(&[PathKey::Field("weather"), PathKey::Index(3)]),
        None
    );
    assert_eq!(raw.get(&[PathKey::Field("main"), PathKey::Index(0)]), None);
}

#[test]
fn test_raw_payload_rejects_fractional_integers() {
    let raw = RawPayload::new(json!({"a": 12.0, "b": 12.5, "c": "12"}));
    assert_eq!(raw.get_i64(&[PathKey::Field("a")]), Some(12));
    assert_eq!(raw.get_i64(&[PathKey::Field("b")]), None);
    assert_eq!(raw.get_i64(&[PathKey::Field("c")]), None);
}

#[test]
fn test_raw_payload_rejects_floats_beyond_i64() {
    let raw = RawPayload::new(json!({"low": -1e19, "high": 1e19, "edge": -9.223_372_036_854_775_808e18}));
    assert_eq!(raw.get_i64(&[PathKey::Field("low")]), None);
    assert_eq!(raw.get_i64(&[PathKey::Field("high")]), None);
    assert_eq!(raw.get_i64(&[PathKey::Field("edge")]), Some(i64::MIN));
}

// ============================================================================
// Normalize Tests
// ============================================================================

#[test]
fn test_normalize_full_payload() {
    let city = CityId::new("London", "GB");
    let record = normalize(&city, &london_payload(), UnitSystem::Metric).unwrap();

    assert_eq!(record.city, "London");
    assert_eq!(record.country, "GB");
    assert_eq!(
        record.observed_at,
        Utc.with_ymd_and_hms(2026, 2, 7, 12, 0, 0).unwrap()
    );
    assert_eq!(record.timestamp_text(), "07-02-2026 12:00:00");
    assert_eq!(record.utc_offset, "+00:00");
    assert_eq!(record.weather.as_deref(), Some("Clouds"));
    assert_eq!(record.weather_description.as_deref(), Some("broken clouds"));
    assert_eq!(record.temperature_current, Some(7.5));
    assert_eq!(record.temperature_feels_like, Some(4.9));
    assert_eq!(record.pressure, Some(1012));
    assert_eq!(record.humidity, Some(81));
    assert_eq!(record.cloudiness, Some(75));
    assert_eq!(record.wind_speed, Some(4.6));
    assert_eq!(record.wind_direction_deg, Some(240.0));
    assert_eq!(record.wind_direction.as_deref(), Some("WSW"));
    assert!(record.sunrise.is_some());
    assert!(record.sunset.is_some());
    assert_eq!(record.units, UnitSystem::Metric);
}

#[test]
fn test_normalize_missing_timestamp() {
    let raw = RawPayload::new(json!({"main": {"temp": 3.0}}));
    let err = normalize(&CityId::new("Oslo", "NO"), &raw, UnitSystem::Metric).unwrap_err();
    assert_eq!(err, NormalizationError::MissingTimestamp);
}

#[test]
fn test_normalize_malformed_timestamp() {
    let raw = RawPayload::new(json!({"dt": "yesterday"}));
    let err = normalize(&CityId::new("Oslo", "NO"), &raw, UnitSystem::Metric).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::InvalidTimestamp {
            value: "yesterday".to_string()
        }
    );
}

#[test]
fn test_normalize_sparse_payload_uses_absent_markers() {
    let raw = RawPayload::new(json!({
        "dt": 1_770_465_600,
        "main": {"temp": "warm", "humidity": 55},
        "wind": {"speed": 3.1}
    }));
    let record = normalize(&CityId::new("Lisbon", "PT"), &raw, UnitSystem::Imperial).unwrap();

    assert_eq!(record.temperature_current, None);
    assert_eq!(record.humidity, Some(55));
    assert_eq!(record.pressure, None);
    assert_eq!(record.weather, None);
    assert_eq!(record.wind_speed, Some(3.1));
    assert_eq!(record.wind_direction_deg, None);
    assert_eq!(record.wind_direction, None);
    assert_eq!(record.utc_offset, "+00:00");
    assert_eq!(record.sunrise, None);
}

#[test]
fn test_normalize_invalid_degrees_keeps_speed() {
    let raw = RawPayload::new(json!({
        "dt": 1_770_465_600,
        "wind": {"speed": 7.2, "deg": 400}
    }));
    let record = normalize(&CityId::new("Wellington", "NZ"), &raw, UnitSystem::Metric).unwrap();
    assert_eq!(record.wind_speed, Some(7.2));
    assert_eq!(record.wind_direction_deg, Some(400.0));
    assert_eq!(record.wind_direction, None);
}

#[test_case(json!(i64::MIN) ; "i64 min")]
#[test_case(json!(-1e19) ; "float below i64")]
#[test_case(json!(1e300) ; "huge float")]
#[test_case(json!("+01:00") ; "text")]
fn test_normalize_extreme_timezone_defaults_to_utc(timezone: serde_json::Value) {
    let raw = RawPayload::new(json!({"dt": 1_770_465_600, "timezone": timezone}));
    let record = normalize(&CityId::new("Lisbon", "PT"), &raw, UnitSystem::Metric).unwrap();
    assert_eq!(record.utc_offset, "+00:00");
}

#[test]
fn test_normalize_falls_back_to_payload_identity() {
    let city = CityId::new("", "");
    let record = normalize(&city, &london_payload(), UnitSystem::Default).unwrap();
    assert_eq!(record.city, "London");
    assert_eq!(record.country, "GB");
}

#[test]
fn test_normalize_missing_identity() {
    let raw = RawPayload::new(json!({"dt": 1_770_465_600}));
    let err = normalize(&CityId::new("", ""), &raw, UnitSystem::Metric).unwrap_err();
    assert_eq!(err, NormalizationError::MissingCity);
}

#[test]
fn test_normalize_honours_boundary_rule() {
    let raw = RawPayload::new(json!({"dt": 1_770_465_600, "wind": {"deg": 11.25}}));
    let city = CityId::new("Oslo", "NO");

    let lower = normalize_with(&city, &raw, UnitSystem::Metric, SectorBoundary::LowerInclusive)
        .unwrap();
    let upper = normalize_with(&city, &raw, UnitSystem::Metric, SectorBoundary::UpperInclusive)
        .unwrap();

    assert_eq!(lower.wind_direction.as_deref(), Some("NNE"));
    assert_eq!(upper.wind_direction.as_deref(), Some("N"));
}
