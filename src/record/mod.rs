//! Weather record model
//!
//! Turns a raw current-weather payload into a [`WeatherRecord`] with a fixed
//! shape: every optional measurement is either a value or the absent marker
//! (`None`), never missing from the record.
//!
//! # Overview
//!
//! - [`RawPayload`] - untyped JSON returned by the API, with path lookups
//! - [`normalize`] - payload to record, failing only on missing identity or time
//! - [`wind_direction`] - degrees to one of 16 compass labels

mod compass;
mod normalize;
mod types;

pub use compass::{wind_direction, wind_direction_with, SectorBoundary, COMPASS_POINTS};
pub use normalize::{format_utc_offset, normalize, normalize_with};
pub use types::{PathKey, RawPayload, WeatherRecord, TIMESTAMP_FORMAT};

#[cfg(test)]
mod tests;
