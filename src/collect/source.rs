//! Remote weather sources

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::record::RawPayload;
use crate::types::{CityId, UnitSystem};
use async_trait::async_trait;
use serde_json::Value;

/// Something that can produce the current-weather payload for a city
///
/// One call is one attempt; retries are the collector's concern. Errors are
/// classified with [`Error::is_retryable`].
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the raw payload for a single city
    async fn fetch(&self, city: &CityId) -> Result<RawPayload>;
}

/// OpenWeather current-weather endpoint
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    units: UnitSystem,
}

impl OpenWeatherSource {
    /// Create a source from an existing client
    pub fn new(
        client: HttpClient,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        units: UnitSystem,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            units,
        }
    }

    /// Build the client and source from the API section of the config
    pub fn from_config(config: &ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut builder = HttpClientConfig::builder().timeout(config.timeout());
        if let Some(rps) = config.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        let client = HttpClient::with_config(builder.build())?;

        Ok(Self::new(client, &config.endpoint, api_key, config.units))
    }

    fn request(&self, city: &CityId) -> RequestConfig {
        RequestConfig::new()
            .query("q", city.query())
            .query("appid", &self.api_key)
            .query("units", self.units.api_param())
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch(&self, city: &CityId) -> Result<RawPayload> {
        let value: Value = self
            .client
            .get_json(&self.endpoint, self.request(city))
            .await?;

        if !value.is_object() {
            return Err(Error::Other(format!(
                "unexpected payload for {city}: expected a JSON object"
            )));
        }
        Ok(RawPayload::new(value))
    }
}
