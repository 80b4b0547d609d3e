//! CoinGecko `/simple/price` client
//!
//! One request returns USD and JPY prices for any number of token ids.
//! The client only classifies the response; retries live in
//! [`RetryPolicy`](super::RetryPolicy).

use super::types::{RawPrices, SourceError};
use super::PriceSource;
use crate::config::PricingConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// CoinGecko public API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Quote currencies requested for every token
pub const VS_CURRENCIES: &str = "usd,jpy";

/// Configuration for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&PricingConfig> for CoinGeckoConfig {
    fn from(config: &PricingConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Client for CoinGecko's simple price endpoint
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    client: Client,
}

impl CoinGeckoClient {
    /// Create a client with default configuration
    pub fn new() -> reqwest::Result<Self> {
        Self::with_config(CoinGeckoConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: CoinGeckoConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn price_url(&self) -> String {
        format!("{}/simple/price", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn simple_price(&self, ids: &[String]) -> Result<RawPrices, SourceError> {
        let url = self.price_url();
        let ids = ids.join(",");

        tracing::debug!(url = %url, ids = %ids, "Requesting prices from CoinGecko");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", VS_CURRENCIES)])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Upstream(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream(format!(
                "CoinGecko API error: {} - {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Upstream(e.to_string()))?;

        parse_prices(&body)
    }
}

/// Parse a `/simple/price` body, e.g. `{"stepn":{"usd":0.12,"jpy":18.5}}`
fn parse_prices(body: &str) -> Result<RawPrices, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))
}
