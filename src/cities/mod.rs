//! City reference dataset
//!
//! Configured cities are checked against a static reference list before any
//! request is made. Validation is a pure predicate behind the
//! [`CityValidator`] trait so the orchestrator can be driven by the bundled
//! OpenWeather city list or by any other source.

mod catalog;

pub use catalog::{normalize_city_name, CityCatalog, CityValidator};
