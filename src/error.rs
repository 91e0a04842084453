//! Error types for the weather ingestion pipeline
//!
//! Two families live here. [`Error`] is the fatal error returned by library
//! APIs; it aborts a run when it escapes the orchestrator. The per-city and
//! per-partition errors ([`CollectionError`], [`NormalizationError`],
//! [`StorageError`]) are plain values captured into run summaries and write
//! reports and never abort a run.

use serde::Serialize;
use thiserror::Error;

/// The main error type
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Destination '{path}' is not writable: {message}")]
    DestinationUnwritable { path: String, message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a destination error
    pub fn unwritable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationUnwritable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration family
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
        )
    }

    /// Check if this error is retryable
    ///
    /// Transport failures, timeouts (including 408), rate limiting and
    /// server errors are transient. Client errors and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !(e.is_decode() || e.is_builder() || e.is_status()),
            Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        408 | 429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Per-city and per-partition errors
// ============================================================================

/// Why a city produced no raw payload
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionError {
    /// The city is not in the reference dataset; no request was made
    #[error("'{city}' is not in the reference city list")]
    InvalidCity { city: String },

    /// The remote service rejected the request permanently
    #[error("non-transient failure on attempt {attempt}: {cause}")]
    NonTransient { attempt: u32, cause: String },

    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts, last error: {last_cause}")]
    Exhausted { attempts: u32, last_cause: String },

    /// The run was cancelled before this city finished
    #[error("collection cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl CollectionError {
    /// Stable identifier for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCity { .. } => "invalid_city",
            Self::NonTransient { .. } => "non_transient",
            Self::Exhausted { .. } => "exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Why a fetched payload could not become a record
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationError {
    #[error("payload has no observation timestamp")]
    MissingTimestamp,

    #[error("observation timestamp is malformed: {value}")]
    InvalidTimestamp { value: String },

    #[error("payload has no city identity")]
    MissingCity,
}

impl NormalizationError {
    /// Stable identifier for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::MissingCity => "missing_city",
        }
    }
}

/// Failure to materialize one partition group
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("failed to write '{path}': {message}")]
pub struct StorageError {
    /// Target file path
    pub path: String,
    /// Underlying cause
    pub message: String,
}

impl StorageError {
    pub fn new(path: impl Into<String>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
