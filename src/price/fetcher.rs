//! Quote fetcher: retrying requests plus per-token validation

use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::types::{FetchError, FetchOutcome, PriceQuote, QuoteMap, QuoteRejection, RawPrices};
use super::PriceSource;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use std::sync::Arc;
use std::time::Instant;

/// Fetches validated USD/JPY quotes for a set of tokens
pub struct QuoteFetcher<P> {
    source: P,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    batch: bool,
}

impl<P: PriceSource> QuoteFetcher<P> {
    /// Create a batching fetcher that sleeps on the tokio timer
    pub fn new(source: P, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            sleeper: Arc::new(TokioSleeper),
            batch: true,
        }
    }

    /// Replace the sleeper used between retries
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Request all tokens at once (true) or one request per token (false)
    pub fn batched(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch quotes for `ids`
    ///
    /// Never panics and never returns early on a bad token: tokens with
    /// missing or invalid data are left out of the success map.
    pub async fn fetch(&self, ids: &[String]) -> FetchOutcome {
        let started = Instant::now();

        let outcome = if self.batch {
            self.fetch_batch(ids).await
        } else {
            self.fetch_each(ids).await
        };

        telemetry::record_latency(LatencyMetric::Fetch, started.elapsed());

        match &outcome {
            FetchOutcome::Success(quotes) => {
                tracing::debug!(
                    requested = ids.len(),
                    received = quotes.len(),
                    "Fetched quotes"
                );
            }
            FetchOutcome::Failure(e) => {
                telemetry::increment(CounterMetric::FetchFailed);
                tracing::warn!(error = %e, kind = e.kind(), "Price fetch failed");
            }
        }

        outcome
    }

    async fn fetch_batch(&self, ids: &[String]) -> FetchOutcome {
        match self.request(ids).await {
            Ok(raw) => FetchOutcome::Success(validate_quotes(ids, &raw)),
            Err(e) => FetchOutcome::Failure(e),
        }
    }

    async fn fetch_each(&self, ids: &[String]) -> FetchOutcome {
        let mut quotes = QuoteMap::new();
        let mut first_error = None;
        let mut failed = 0;

        for id in ids {
            let single = std::slice::from_ref(id);
            match self.request(single).await {
                Ok(raw) => quotes.extend(validate_quotes(single, &raw)),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(token = %id, error = %e, "Token fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if failed == ids.len() => FetchOutcome::Failure(e),
            _ => FetchOutcome::Success(quotes),
        }
    }

    async fn request(&self, ids: &[String]) -> Result<RawPrices, FetchError> {
        self.policy
            .run(self.sleeper.as_ref(), move |attempt| {
                telemetry::increment(CounterMetric::FetchAttempt);
                tracing::debug!(attempt, tokens = ids.len(), "Price request");
                self.source.simple_price(ids)
            })
            .await
    }
}

/// Keep the requested tokens whose quotes are complete and sane
pub fn validate_quotes(ids: &[String], raw: &RawPrices) -> QuoteMap {
    let mut quotes = QuoteMap::new();

    for id in ids {
        match validate_quote(raw.get(id)) {
            Ok(quote) => {
                quotes.insert(id.clone(), quote);
            }
            Err(reason) => {
                telemetry::increment(CounterMetric::QuoteRejected);
                tracing::warn!(token = %id, %reason, "Dropping quote");
            }
        }
    }

    quotes
}

/// Validate one token entry from the response
pub fn validate_quote(entry: Option<&serde_json::Value>) -> Result<PriceQuote, QuoteRejection> {
    let entry = entry
        .filter(|v| v.is_object())
        .ok_or(QuoteRejection::Missing)?;

    let usd = price_field(entry, "usd").ok_or(QuoteRejection::InvalidUsd)?;
    let jpy = price_field(entry, "jpy").ok_or(QuoteRejection::InvalidJpy)?;

    Ok(PriceQuote { usd, jpy })
}

fn price_field(entry: &serde_json::Value, currency: &str) -> Option<f64> {
    entry
        .get(currency)
        .and_then(serde_json::Value::as_f64)
        .filter(|p| p.is_finite() && *p >= 0.0)
}
