//! Weather collection
//!
//! Fetches one raw payload per city from a [`WeatherSource`], applying the
//! retry policy to each city independently. Cities run concurrently under a
//! configured bound and results are merged into a map keyed by city, so no
//! two workers ever write the same slot.
//!
//! # Example
//!
//! ```ignore
//! let collector = Collector::new(Arc::new(source), RetryPolicy::default(), 4);
//! let results = collector.collect(&cities, &CancellationToken::new()).await;
//! ```

mod collector;
mod source;

pub use collector::{CollectionResults, Collector};
pub use source::{OpenWeatherSource, WeatherSource};
