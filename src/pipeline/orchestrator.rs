//! Pipeline orchestration

use super::state::RunState;
use super::summary::{CityDisposition, CityOutcome, RunBatch, RunSummary};
use crate::cities::CityValidator;
use crate::collect::{Collector, OpenWeatherSource, WeatherSource};
use crate::config::PipelineConfig;
use crate::error::{CollectionError, Result};
use crate::http::RetryPolicy;
use crate::output::{BatchWriter, WriteReport};
use crate::record::normalize_with;
use crate::types::{CityId, RunTimestamp};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators handed to the pipeline at construction
#[derive(Clone)]
pub struct PipelineContext {
    /// Remote weather API
    pub source: Arc<dyn WeatherSource>,
    /// Reference city dataset
    pub validator: Arc<dyn CityValidator>,
}

impl PipelineContext {
    pub fn new(source: Arc<dyn WeatherSource>, validator: Arc<dyn CityValidator>) -> Self {
        Self { source, validator }
    }
}

/// One configured batch job
pub struct Pipeline {
    config: PipelineConfig,
    validator: Arc<dyn CityValidator>,
    collector: Collector,
    writer: BatchWriter,
}

impl Pipeline {
    /// Build a pipeline from a configuration and explicit collaborators
    pub fn new(config: PipelineConfig, ctx: PipelineContext) -> Result<Self> {
        config.validate()?;

        let api = &config.api;
        let policy = RetryPolicy::constant(api.retry_attempts, api.retry_delay())
            .with_backoff(api.backoff, api.max_retry_delay());
        let collector = Collector::new(ctx.source, policy, api.concurrency);
        let writer = BatchWriter::new(&config.storage, api.units);

        Ok(Self {
            config,
            validator: ctx.validator,
            collector,
            writer,
        })
    }

    /// Build a pipeline that talks to OpenWeather
    ///
    /// The API key is read from the environment variable named in the
    /// configuration; a missing key is a configuration error.
    pub fn from_config(config: PipelineConfig, validator: Arc<dyn CityValidator>) -> Result<Self> {
        let api_key = config.api.api_key()?;
        let source = OpenWeatherSource::from_config(&config.api, api_key)?;
        Self::new(config, PipelineContext::new(Arc::new(source), validator))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one batch
    ///
    /// Per-city failures never abort the run. Only an unusable destination
    /// fails it. If `cancel` fires before writing starts, nothing is written.
    pub async fn run(&self, cancel: &CancellationToken) -> RunSummary {
        let started = Instant::now();
        let mut run = Run::new(RunBatch::new(RunTimestamp::now(), self.config.storage.clone()));

        info!(
            run = %run.batch.run_timestamp,
            cities = self.config.cities.len(),
            format = %self.config.storage.format,
            layout = %self.config.storage.layout,
            "Run started"
        );

        let write_report = self.execute(&mut run, cancel).await;

        let summary = RunSummary {
            run_timestamp: run.batch.run_timestamp,
            state: run.state,
            cities: run.batch.outcomes,
            write_report,
            error: run.error,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            run = %summary.run_timestamp,
            state = %summary.state,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            duration_ms = summary.duration_ms,
            "Run finished"
        );
        summary
    }

    async fn execute(&self, run: &mut Run, cancel: &CancellationToken) -> Option<WriteReport> {
        let cities = self.config.city_ids();
        run.advance(RunState::Validating);
        let valid = self.validate_cities(&cities, run);
        if run.cancel_if(cancel, &cities) {
            return None;
        }

        run.advance(RunState::Collecting);
        let mut results = self.collector.collect(&valid, cancel).await;
        if run.cancel_if(cancel, &cities) {
            return None;
        }

        run.advance(RunState::Normalizing);
        let boundary = self.config.normalize.compass_boundary;
        let units = self.config.api.units;
        for city in &cities {
            let Some(result) = results.remove(city) else {
                continue;
            };
            let disposition = match result {
                Ok(raw) => match normalize_with(city, &raw, units, boundary) {
                    Ok(record) => CityDisposition::Success { record },
                    Err(error) => CityDisposition::NormalizationFailed { error },
                },
                Err(error) => CityDisposition::CollectionFailed { error },
            };
            log_outcome(city, &disposition);
            run.batch.push(CityOutcome::new(city.clone(), disposition));
        }
        run.batch.outcomes.sort_by_key(|o| position(&cities, &o.city));
        if run.cancel_if(cancel, &cities) {
            return None;
        }

        run.advance(RunState::Writing);
        let records = run.batch.records();
        match self.writer.write(&records, &run.batch.run_timestamp).await {
            Ok(report) => {
                for failed in report.failed() {
                    warn!(path = %failed.path.display(), records = failed.records, "Partition not written");
                }
                run.advance(RunState::Completed);
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "Destination unusable");
                run.fail(e.to_string());
                None
            }
        }
    }

    fn validate_cities(&self, cities: &[CityId], run: &mut Run) -> Vec<CityId> {
        let mut valid = Vec::with_capacity(cities.len());
        for city in cities {
            if self.validator.is_valid(city) {
                valid.push(city.clone());
            } else {
                let disposition = CityDisposition::InvalidCity {
                    error: CollectionError::InvalidCity {
                        city: city.to_string(),
                    },
                };
                log_outcome(city, &disposition);
                run.batch.push(CityOutcome::new(city.clone(), disposition));
            }
        }
        debug!(valid = valid.len(), invalid = cities.len() - valid.len(), "Cities validated");
        valid
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("collector", &self.collector)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

/// Mutable state of one execution
struct Run {
    batch: RunBatch,
    state: RunState,
    error: Option<String>,
}

impl Run {
    fn new(batch: RunBatch) -> Self {
        Self {
            batch,
            state: RunState::Configured,
            error: None,
        }
    }

    fn advance(&mut self, next: RunState) {
        match self.state.transition(next) {
            Ok(state) => {
                debug!(from = %self.state, to = %state, "Run state");
                self.state = state;
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn fail(&mut self, message: String) {
        self.state = RunState::Failed;
        self.error = Some(message);
    }

    /// Move to `Cancelled` if the token fired; returns true when it did
    ///
    /// Cities without an outcome yet are recorded as cancelled, so the
    /// summary still lists every configured city.
    fn cancel_if(&mut self, cancel: &CancellationToken, cities: &[CityId]) -> bool {
        if !cancel.is_cancelled() {
            return false;
        }
        warn!(state = %self.state, "Run cancelled, discarding collected data");
        self.advance(RunState::Cancelled);

        let mut outcomes = Vec::with_capacity(cities.len());
        for city in cities {
            let outcome = match self.batch.outcomes.iter().position(|o| &o.city == city) {
                Some(i) => self.batch.outcomes.swap_remove(i),
                None => CityOutcome::new(
                    city.clone(),
                    CityDisposition::CollectionFailed {
                        error: CollectionError::Cancelled { attempts: 0 },
                    },
                ),
            };
            outcomes.push(outcome);
        }
        self.batch.outcomes = outcomes;
        true
    }
}

fn position(cities: &[CityId], city: &CityId) -> usize {
    cities.iter().position(|c| c == city).unwrap_or(usize::MAX)
}

fn log_outcome(city: &CityId, disposition: &CityDisposition) {
    match disposition.error_message() {
        None => info!(city = %city, outcome = disposition.kind(), "City processed"),
        Some(cause) => warn!(
            city = %city,
            outcome = disposition.kind(),
            error_kind = disposition.error_kind().unwrap_or_default(),
            "City failed: {}",
            cause
        ),
    }
}
