//! Per-city outcomes and run summaries

use super::state::RunState;
use crate::config::StorageConfig;
use crate::error::{CollectionError, NormalizationError};
use crate::output::WriteReport;
use crate::record::WeatherRecord;
use crate::types::{CityId, RunTimestamp};
use serde::Serialize;

/// What happened to one configured city
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CityDisposition {
    /// Fetched and normalized
    Success {
        #[serde(skip)]
        record: WeatherRecord,
    },
    /// Rejected by the reference dataset before any request
    InvalidCity { error: CollectionError },
    /// Fetch failed permanently, exhausted its retries or was cancelled
    CollectionFailed { error: CollectionError },
    /// Fetched, but the payload could not become a record
    NormalizationFailed { error: NormalizationError },
}

impl CityDisposition {
    /// Stable identifier used in summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::InvalidCity { .. } => "invalid_city",
            Self::CollectionFailed { .. } => "collection_failed",
            Self::NormalizationFailed { .. } => "normalization_failed",
        }
    }

    /// Kind of the underlying error, if any
    pub fn error_kind(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::InvalidCity { error } | Self::CollectionFailed { error } => Some(error.kind()),
            Self::NormalizationFailed { error } => Some(error.kind()),
        }
    }

    /// Human-readable cause, if any
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::InvalidCity { error } | Self::CollectionFailed { error } => Some(error.to_string()),
            Self::NormalizationFailed { error } => Some(error.to_string()),
        }
    }
}

/// Disposition of one configured city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityOutcome {
    #[serde(flatten)]
    pub city: CityId,
    #[serde(flatten)]
    pub disposition: CityDisposition,
}

impl CityOutcome {
    pub fn new(city: CityId, disposition: CityDisposition) -> Self {
        Self { city, disposition }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.disposition, CityDisposition::Success { .. })
    }

    /// The record, for successful cities
    pub fn record(&self) -> Option<&WeatherRecord> {
        match &self.disposition {
            CityDisposition::Success { record } => Some(record),
            _ => None,
        }
    }
}

/// Everything one execution produced before writing
#[derive(Debug, Clone)]
pub struct RunBatch {
    /// Assigned once at run start; shared by every file of the run
    pub run_timestamp: RunTimestamp,
    /// Destination in effect for the run
    pub storage: StorageConfig,
    /// One entry per configured city, in configuration order
    pub outcomes: Vec<CityOutcome>,
}

impl RunBatch {
    pub fn new(run_timestamp: RunTimestamp, storage: StorageConfig) -> Self {
        Self {
            run_timestamp,
            storage,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: CityOutcome) {
        self.outcomes.push(outcome);
    }

    /// Records of successful cities, in configuration order
    pub fn records(&self) -> Vec<WeatherRecord> {
        self.outcomes
            .iter()
            .filter_map(CityOutcome::record)
            .cloned()
            .collect()
    }
}

/// Final account of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_timestamp: RunTimestamp,
    pub state: RunState,
    /// Every configured city with its disposition
    pub cities: Vec<CityOutcome>,
    /// Present once the writer stage ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_report: Option<WriteReport>,
    /// Fatal cause for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl RunSummary {
    /// Cities that produced a record
    pub fn succeeded(&self) -> usize {
        self.cities.iter().filter(|c| c.is_success()).count()
    }

    /// Cities that did not
    pub fn failed(&self) -> usize {
        self.cities.len() - self.succeeded()
    }

    /// Outcome for a given city
    pub fn outcome(&self, city: &CityId) -> Option<&CityOutcome> {
        self.cities.iter().find(|c| &c.city == city)
    }

    /// Process exit code: 0 completed, 130 cancelled, 1 failed
    pub fn exit_code(&self) -> i32 {
        match self.state {
            RunState::Completed => 0,
            RunState::Cancelled => 130,
            _ => 1,
        }
    }
}
