// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # weather-ingest
//!
//! Batch ingestion of current-weather observations for a configured list of
//! cities into a partitioned dataset on local storage.
//!
//! ## Features
//!
//! - **Validated Collection**: Cities are checked against a reference list before any request
//! - **Retry and Rate Limiting**: Transient failures are retried with bounded backoff
//! - **Flat Records**: Nested payloads become one fixed-schema row per city
//! - **Partitioned Output**: CSV, JSON lines or Parquet under date/country/city directories
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use weather_ingest::{load_config, CityCatalog, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> weather_ingest::Result<()> {
//!     let config = load_config("config/config.yaml")?;
//!     let catalog = CityCatalog::from_path("config/city.list.json")?;
//!
//!     let pipeline = Pipeline::from_config(config, Arc::new(catalog))?;
//!     let summary = pipeline.run(&CancellationToken::new()).await;
//!
//!     println!("{} cities written", summary.succeeded());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Pipeline                             │
//! │  validate → collect → normalize → write      RunSummary        │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬───────────┬──────┴──────┬─────────────┬────────────┐
//! │  Cities   │  Collect  │   Record    │  Partition  │   Output   │
//! ├───────────┼───────────┼─────────────┼─────────────┼────────────┤
//! │ Catalog   │ Source    │ Normalize   │ Layouts     │ CSV        │
//! │ Validator │ Retry     │ Compass     │ Hive style  │ JSON lines │
//! │           │ Rate Limit│ UTC offset  │ Sanitize    │ Parquet    │
//! └───────────┴───────────┴─────────────┴─────────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration
pub mod config;

/// Reference city list and validation
pub mod cities;

/// Raw payloads, normalization and flat records
pub mod record;

/// HTTP client with retry and rate limiting
pub mod http;

/// Concurrent collection from the weather API
pub mod collect;

/// Partition planning
pub mod partition;

/// CSV, JSON and Parquet output
pub mod output;

/// Run orchestration and summaries
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use cities::{CityCatalog, CityValidator};
pub use config::{load_config, load_config_from_str, PipelineConfig};
pub use pipeline::{Pipeline, PipelineContext, RunState, RunSummary};
pub use record::{normalize, WeatherRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
