//! Tests for the pipeline module

use super::*;
use crate::cities::CityCatalog;
use crate::collect::WeatherSource;
use crate::config::{load_config_from_str, PipelineConfig};
use crate::error::{CollectionError, Error, NormalizationError, Result};
use crate::record::RawPayload;
use crate::types::CityId;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use test_case::test_case;
use tokio_util::sync::CancellationToken;

/// Responds from a fixed table; unknown cities get a 404
#[derive(Default)]
struct TableSource {
    payloads: HashMap<CityId, Value>,
    calls: Mutex<Vec<CityId>>,
    cancel_on_fetch: Option<CancellationToken>,
}

impl TableSource {
    fn with(mut self, name: &str, country: &str, payload: Value) -> Self {
        self.payloads.insert(CityId::new(name, country), payload);
        self
    }

    fn calls_for(&self, city: &CityId) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == city).count()
    }
}

#[async_trait]
impl WeatherSource for TableSource {
    async fn fetch(&self, city: &CityId) -> Result<RawPayload> {
        self.calls.lock().unwrap().push(city.clone());
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }
        match self.payloads.get(city) {
            Some(payload) => Ok(RawPayload::new(payload.clone())),
            None => Err(Error::http_status(404, "city not found")),
        }
    }
}

fn payload(dt: Value) -> Value {
    json!({
        "weather": [{"main": "Clear", "description": "clear sky"}],
        "main": {"temp": 4.2, "pressure": 1020, "humidity": 70},
        "wind": {"speed": 2.1, "deg": 90},
        "dt": dt,
        "timezone": 3600
    })
}

fn config(base: &Path, cities: &[(&str, &str)]) -> PipelineConfig {
    let cities: String = cities
        .iter()
        .map(|(n, c)| format!("  - {{ name: \"{n}\", country: \"{c}\" }}\n"))
        .collect();
    load_config_from_str(&format!(
        r#"
api:
  endpoint: http://localhost:9/weather
  retry_attempts: 2
  retry_delay_ms: 1
storage:
  format: csv
  layout: hive_compact
  base_path: {}
cities:
{cities}"#,
        base.display()
    ))
    .unwrap()
}

fn pipeline(config: PipelineConfig, source: Arc<TableSource>, catalog: CityCatalog) -> Pipeline {
    Pipeline::new(config, PipelineContext::new(source, Arc::new(catalog))).unwrap()
}

// ============================================================================
// State Machine Tests
// ============================================================================

#[test_case(RunState::Configured, RunState::Validating, true ; "start")]
#[test_case(RunState::Validating, RunState::Collecting, true ; "collect")]
#[test_case(RunState::Collecting, RunState::Normalizing, true ; "normalize")]
#[test_case(RunState::Normalizing, RunState::Writing, true ; "write")]
#[test_case(RunState::Writing, RunState::Completed, true ; "complete")]
#[test_case(RunState::Collecting, RunState::Failed, true ; "fail mid run")]
#[test_case(RunState::Collecting, RunState::Cancelled, true ; "cancel mid run")]
#[test_case(RunState::Writing, RunState::Cancelled, false ; "no cancel while writing")]
#[test_case(RunState::Configured, RunState::Writing, false ; "no skipping")]
#[test_case(RunState::Completed, RunState::Failed, false ; "terminal")]
#[test_case(RunState::Writing, RunState::Normalizing, false ; "no going back")]
fn test_run_state_transitions(from: RunState, to: RunState, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
    assert_eq!(from.transition(to).is_ok(), allowed);
}

#[test]
fn test_run_state_terminal() {
    assert!(RunState::Completed.is_terminal());
    assert!(RunState::Failed.is_terminal());
    assert!(RunState::Cancelled.is_terminal());
    assert!(!RunState::Writing.is_terminal());
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_run_completes_and_writes() {
    let dir = tempdir().unwrap();
    let source = Arc::new(
        TableSource::default()
            .with("London", "GB", payload(json!(1_770_465_600)))
            .with("Paris", "FR", payload(json!(1_770_465_600))),
    );
    let catalog = CityCatalog::from_entries([("London", "GB"), ("Paris", "FR")]);
    let pipeline = pipeline(
        config(dir.path(), &[("London", "GB"), ("Paris", "FR")]),
        source,
        catalog,
    );

    let summary = pipeline.run(&CancellationToken::new()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.succeeded(), 2);
    let report = summary.write_report.as_ref().unwrap();
    assert_eq!(report.files_written(), 2);

    let ts = summary.run_timestamp;
    assert!(dir
        .path()
        .join(format!("2026/02/07/GB/London/weather_{ts}.csv"))
        .is_file());
    assert!(dir
        .path()
        .join(format!("2026/02/07/FR/Paris/weather_{ts}.csv"))
        .is_file());
}

#[tokio::test]
async fn test_run_partial_failure() {
    let dir = tempdir().unwrap();
    let source = Arc::new(
        TableSource::default()
            .with("Alpha", "GB", payload(json!(1_770_465_600)))
            .with("Gamma", "GB", payload(json!("not-a-time"))),
    );
    let catalog = CityCatalog::from_entries([("Alpha", "GB"), ("Beta", "GB"), ("Gamma", "GB")]);
    let pipeline = pipeline(
        config(dir.path(), &[("Alpha", "GB"), ("Beta", "GB"), ("Gamma", "GB")]),
        source.clone(),
        catalog,
    );

    let summary = pipeline.run(&CancellationToken::new()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.exit_code(), 0);
    let names: Vec<&str> = summary.cities.iter().map(|c| c.city.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    let kinds: Vec<&str> = summary.cities.iter().map(|c| c.disposition.kind()).collect();
    assert_eq!(kinds, vec!["success", "collection_failed", "normalization_failed"]);
    assert_eq!(summary.cities[1].disposition.error_kind(), Some("non_transient"));
    assert_eq!(
        summary.cities[2].disposition,
        CityDisposition::NormalizationFailed {
            error: NormalizationError::InvalidTimestamp {
                value: "not-a-time".to_string()
            }
        }
    );

    let report = summary.write_report.as_ref().unwrap();
    assert_eq!(report.records_written(), 1);
    assert_eq!(report.partitions.len(), 1);
    assert!(report.partitions[0].partition.contains("Alpha"));
    assert_eq!(source.calls_for(&CityId::new("Beta", "GB")), 1);
}

#[tokio::test]
async fn test_invalid_city_is_never_fetched() {
    let dir = tempdir().unwrap();
    let source = Arc::new(TableSource::default().with("London", "GB", payload(json!(1_770_465_600))));
    let catalog = CityCatalog::from_entries([("London", "GB")]);
    let pipeline = pipeline(
        config(dir.path(), &[("London", "GB"), ("Atlantis", "GR")]),
        source.clone(),
        catalog,
    );

    let summary = pipeline.run(&CancellationToken::new()).await;

    let atlantis = CityId::new("Atlantis", "GR");
    assert_eq!(source.calls_for(&atlantis), 0);
    assert_eq!(
        summary.outcome(&atlantis).unwrap().disposition,
        CityDisposition::InvalidCity {
            error: CollectionError::InvalidCity {
                city: "GR.Atlantis".to_string()
            }
        }
    );
    assert_eq!(summary.state, RunState::Completed);
}

#[tokio::test]
async fn test_zero_successes_still_completes() {
    let dir = tempdir().unwrap();
    let source = Arc::new(TableSource::default());
    let catalog = CityCatalog::from_entries([("Oslo", "NO")]);
    let pipeline = pipeline(config(dir.path(), &[("Oslo", "NO")]), source, catalog);

    let summary = pipeline.run(&CancellationToken::new()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.succeeded(), 0);
    assert_eq!(summary.failed(), 1);
    assert!(summary.write_report.as_ref().unwrap().is_empty());
}

#[tokio::test]
async fn test_unwritable_destination_fails_run() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();

    let source = Arc::new(TableSource::default().with("Oslo", "NO", payload(json!(1_770_465_600))));
    let catalog = CityCatalog::from_entries([("Oslo", "NO")]);
    let pipeline = pipeline(config(&blocker.join("out"), &[("Oslo", "NO")]), source, catalog);

    let summary = pipeline.run(&CancellationToken::new()).await;

    assert_eq!(summary.state, RunState::Failed);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.error.as_deref().unwrap().contains("not writable"));
    assert!(summary.write_report.is_none());
    assert_eq!(summary.succeeded(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_writes_nothing() {
    let dir = tempdir().unwrap();
    let source = Arc::new(TableSource::default().with("Oslo", "NO", payload(json!(1_770_465_600))));
    let catalog = CityCatalog::from_entries([("Oslo", "NO")]);
    let pipeline = pipeline(config(dir.path(), &[("Oslo", "NO")]), source.clone(), catalog);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = pipeline.run(&cancel).await;

    assert_eq!(summary.state, RunState::Cancelled);
    assert_eq!(summary.exit_code(), 130);
    assert!(summary.write_report.is_none());
    assert_eq!(source.calls.lock().unwrap().len(), 0);
    assert_eq!(summary.cities.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_cancelled_during_collection_writes_nothing() {
    let dir = tempdir().unwrap();
    let cancel = CancellationToken::new();
    let mut source = TableSource::default()
        .with("Oslo", "NO", payload(json!(1_770_465_600)))
        .with("Bergen", "NO", payload(json!(1_770_465_600)));
    source.cancel_on_fetch = Some(cancel.clone());
    let catalog = CityCatalog::from_entries([("Oslo", "NO"), ("Bergen", "NO")]);
    let pipeline = pipeline(
        config(dir.path(), &[("Oslo", "NO"), ("Bergen", "NO")]),
        Arc::new(source),
        catalog,
    );

    let summary = pipeline.run(&cancel).await;

    assert_eq!(summary.state, RunState::Cancelled);
    assert!(summary.write_report.is_none());
    assert_eq!(summary.cities.len(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_summary_serializes_dispositions() {
    let dir = tempdir().unwrap();
    let source = Arc::new(TableSource::default().with("Oslo", "NO", payload(json!(1_770_465_600))));
    let catalog = CityCatalog::from_entries([("Oslo", "NO")]);
    let pipeline = pipeline(
        config(dir.path(), &[("Oslo", "NO"), ("Nowhere", "XX")]),
        source,
        catalog,
    );

    let summary = pipeline.run(&CancellationToken::new()).await;
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["state"], "completed");
    assert_eq!(json["cities"][0]["name"], "Oslo");
    assert_eq!(json["cities"][0]["status"], "success");
    assert_eq!(json["cities"][1]["status"], "invalid_city");
    assert_eq!(json["cities"][1]["error"]["kind"], "invalid_city");
    assert_eq!(json["run_timestamp"], summary.run_timestamp.to_string());
}

#[tokio::test]
async fn test_validator_closure() {
    let dir = tempdir().unwrap();
    let fetched = Arc::new(AtomicUsize::new(0));
    let counter = fetched.clone();
    let validator = move |city: &CityId| {
        counter.fetch_add(1, Ordering::SeqCst);
        city.country == "NO"
    };
    let source = Arc::new(TableSource::default().with("Oslo", "NO", payload(json!(1_770_465_600))));
    let pipeline = Pipeline::new(
        config(dir.path(), &[("Oslo", "NO"), ("Lyon", "FR")]),
        PipelineContext::new(source, Arc::new(validator)),
    )
    .unwrap();

    let summary = pipeline.run(&CancellationToken::new()).await;

    assert_eq!(fetched.load(Ordering::SeqCst), 2);
    assert_eq!(summary.succeeded(), 1);
}

#[test]
fn test_from_config_requires_api_key() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), &[("Oslo", "NO")]);
    config.api.api_key_env = "WEATHER_INGEST_TEST_UNSET_KEY".to_string();

    let err = Pipeline::from_config(config, Arc::new(CityCatalog::default())).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_run_batch_records_in_order() {
    let mut batch = RunBatch::new(
        crate::types::RunTimestamp::now(),
        crate::config::StorageConfig::new("data"),
    );
    batch.push(CityOutcome::new(
        CityId::new("Nowhere", "XX"),
        CityDisposition::InvalidCity {
            error: CollectionError::InvalidCity {
                city: "XX.Nowhere".to_string(),
            },
        },
    ));
    assert!(batch.records().is_empty());
}
