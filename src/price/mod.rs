//! Price fetching module
//!
//! Retrieves USD/JPY quotes from CoinGecko with a fixed-delay retry policy
//! for rate limits.

mod coingecko;
mod fetcher;
mod retry;
mod types;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_URL, VS_CURRENCIES};
pub use fetcher::{validate_quote, validate_quotes, QuoteFetcher};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::{
    FetchError, FetchOutcome, PriceQuote, QuoteMap, QuoteRejection, RawPrices, SourceError,
};

use async_trait::async_trait;

/// Trait for price source implementations
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// One request for USD and JPY prices of `ids`, without retries
    async fn simple_price(&self, ids: &[String]) -> Result<RawPrices, SourceError>;
}

#[async_trait]
impl<T: PriceSource + ?Sized> PriceSource for std::sync::Arc<T> {
    async fn simple_price(&self, ids: &[String]) -> Result<RawPrices, SourceError> {
        (**self).simple_price(ids).await
    }
}
