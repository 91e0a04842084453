//! HTTP plumbing
//!
//! A single-attempt client, a token bucket rate limiter and a retry policy
//! that wraps any async operation.
//!
//! # Features
//!
//! - **Error Classification**: 429, other statuses and timeouts map to
//!   distinct error variants
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Cancellation**: Retries stop promptly when the run is cancelled

mod client;
mod rate_limit;
mod retry;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{retry_with_policy, RetryError, RetryPolicy};
