//! Concurrent, retrying collection across cities

use super::source::WeatherSource;
use crate::error::{CollectionError, Error};
use crate::http::{retry_with_policy, RetryError, RetryPolicy};
use crate::record::RawPayload;
use crate::types::CityId;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-city collection outcome, keyed by city
pub type CollectionResults = HashMap<CityId, Result<RawPayload, CollectionError>>;

/// Fetches every city through a shared source with per-city retries
#[derive(Clone)]
pub struct Collector {
    source: Arc<dyn WeatherSource>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl Collector {
    /// Create a collector; a concurrency of zero is treated as one
    pub fn new(source: Arc<dyn WeatherSource>, policy: RetryPolicy, concurrency: usize) -> Self {
        Self {
            source,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// The retry policy applied to each city
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Collect one payload per city
    ///
    /// Every input city gets exactly one entry. Duplicate ids collapse into
    /// a single fetch. Once `cancel` fires, no new requests are issued and
    /// unfinished cities resolve to [`CollectionError::Cancelled`].
    pub async fn collect(&self, cities: &[CityId], cancel: &CancellationToken) -> CollectionResults {
        let mut unique: Vec<&CityId> = cities.iter().collect();
        unique.sort();
        unique.dedup();

        let started = Instant::now();
        let results: CollectionResults = stream::iter(unique)
            .map(|city| async move {
                let outcome = self.collect_one(city, cancel).await;
                (city.clone(), outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failed = results.values().filter(|r| r.is_err()).count();
        info!(
            cities = results.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection finished"
        );
        results
    }

    async fn collect_one(
        &self,
        city: &CityId,
        cancel: &CancellationToken,
    ) -> Result<RawPayload, CollectionError> {
        debug!(city = %city, "Fetching");
        let outcome = retry_with_policy(&self.policy, cancel, Error::is_retryable, |attempt| {
            debug!(city = %city, attempt, "Attempt");
            self.source.fetch(city)
        })
        .await;

        match outcome {
            Ok(payload) => {
                debug!(city = %city, "Fetched");
                Ok(payload)
            }
            Err(err) => {
                let err = to_collection_error(err);
                warn!(city = %city, kind = err.kind(), "Collection failed: {}", err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn to_collection_error(err: RetryError<Error>) -> CollectionError {
    match err {
        RetryError::Exhausted { attempts, last } => CollectionError::Exhausted {
            attempts,
            last_cause: last.to_string(),
        },
        RetryError::Permanent { attempt, error } => CollectionError::NonTransient {
            attempt,
            cause: error.to_string(),
        },
        RetryError::Cancelled { attempts } => CollectionError::Cancelled { attempts },
    }
}
