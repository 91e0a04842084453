//! Retry policy for fallible async operations
//!
//! Lives apart from [`super::HttpClient`] so the same bounded, cancellable
//! loop can wrap any operation and be tested without a network.

use crate::types::BackoffType;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounded retry schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Base delay between attempts
    pub delay: Duration,
    /// How the delay grows with each attempt
    pub backoff: BackoffType,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            backoff: BackoffType::Constant,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Constant-delay policy
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: BackoffType::Constant,
            max_delay: delay,
        }
    }

    /// Set the backoff shape and the delay ceiling
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffType, max_delay: Duration) -> Self {
        self.backoff = backoff;
        self.max_delay = max_delay;
        self
    }

    /// Delay after the given failed attempt (1-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        let delay = match self.backoff {
            BackoffType::Constant => self.delay,
            BackoffType::Linear => self.delay.saturating_mul(step + 1),
            BackoffType::Exponential => self.delay.saturating_mul(2u32.saturating_pow(step)),
        };

        std::cmp::min(delay, std::cmp::max(self.max_delay, self.delay))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that is not worth retrying
    Permanent { attempt: u32, error: E },
    /// The token fired before the operation succeeded
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Number of attempts actually started
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
            Self::Permanent { attempt, .. } => *attempt,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, runs out of attempts or
/// is cancelled
///
/// `op` receives the 1-based attempt number. Cancellation is observed both
/// while an attempt is in flight and while sleeping between attempts.
pub async fn retry_with_policy<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    is_transient: P,
    mut op: Op,
) -> Result<T, RetryError<E>>
where
    E: Display,
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: attempt });
        }
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
            outcome = op(attempt) => outcome,
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !is_transient(&error) {
            return Err(RetryError::Permanent { attempt, error });
        }
        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = policy.calculate_backoff(attempt);
        warn!(
            "Attempt {}/{} failed: {}, retrying in {:?}",
            attempt, max_attempts, error, delay
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
            () = tokio::time::sleep(delay) => {}
        }
    }
}
