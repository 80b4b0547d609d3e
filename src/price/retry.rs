//! Fixed-delay retry policy for rate-limited requests

use super::types::{FetchError, SourceError};
use crate::config::PricingConfig;
use crate::telemetry::{self, CounterMetric};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Source of delays, replaceable in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry on 429 only, with a constant pause between attempts
///
/// `max_attempts` counts every request, the first one included. Any error
/// other than a rate limit ends the loop immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&PricingConfig> for RetryPolicy {
    fn from(config: &PricingConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total attempts, never less than one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails for good, or attempts run out
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(SourceError::RateLimited) => {
                    telemetry::increment(CounterMetric::FetchRateLimited);

                    if attempt >= max_attempts {
                        tracing::warn!(attempt, max_attempts, "Rate limited, giving up");
                        return Err(FetchError::RateLimited { attempts: attempt });
                    }

                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_secs = self.delay.as_secs_f64(),
                        "Rate limited, retrying"
                    );
                    sleeper.sleep(self.delay).await;
                }
                Err(SourceError::Upstream(e)) => return Err(FetchError::Upstream(e)),
                Err(SourceError::Malformed(e)) => return Err(FetchError::Malformed(e)),
            }
        }
    }
}
