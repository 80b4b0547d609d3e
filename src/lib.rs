//! price-ticker: CoinGecko prices mirrored into Discord channels
//!
//! This library provides the core components for:
//! - Price fetching from CoinGecko with rate-limit retries
//! - Planning channel renames and posts from fetched quotes
//! - Applying updates through the Discord REST API
//! - A periodic, non-overlapping sync scheduler
//! - A liveness endpoint and the observability stack

pub mod cli;
pub mod config;
pub mod notify;
pub mod plan;
pub mod price;
pub mod server;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
mod testing;
