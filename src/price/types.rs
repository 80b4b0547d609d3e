//! Price quote types

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Raw `/simple/price` body: token id to currency map
pub type RawPrices = HashMap<String, serde_json::Value>;

/// Validated quotes keyed by token id
pub type QuoteMap = HashMap<String, PriceQuote>;

/// A token price in both quote currencies
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub usd: f64,
    pub jpy: f64,
}

/// Result of one fetch for a set of tokens
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Quotes for every token that passed validation
    Success(QuoteMap),
    /// No quotes at all this cycle
    Failure(FetchError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Validated quotes, if the fetch succeeded
    pub fn quotes(&self) -> Option<&QuoteMap> {
        match self {
            FetchOutcome::Success(quotes) => Some(quotes),
            FetchOutcome::Failure(_) => None,
        }
    }
}

/// Why a fetch produced no quotes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Every attempt was answered with 429
    #[error("Rate limited, gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },
    /// Transport failure, timeout or unexpected status
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// Body could not be parsed
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Upstream(_) => "upstream",
            FetchError::Malformed(_) => "malformed",
        }
    }
}

/// Error from a single request to the price source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Rate limited")]
    RateLimited,
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Why a single token was left out of a successful fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteRejection {
    /// Token absent from the response
    Missing,
    /// `usd` absent, non-numeric, negative or non-finite
    InvalidUsd,
    /// `jpy` absent, non-numeric, negative or non-finite
    InvalidJpy,
}

impl fmt::Display for QuoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteRejection::Missing => write!(f, "missing from response"),
            QuoteRejection::InvalidUsd => write!(f, "invalid usd price"),
            QuoteRejection::InvalidJpy => write!(f, "invalid jpy price"),
        }
    }
}
