//! CLI interface for price-ticker
//!
//! Provides subcommands for:
//! - `run`: Start the scheduler and liveness server
//! - `once`: Run a single sync cycle and print the report
//! - `prices`: Fetch and print current prices
//! - `config`: Show the effective configuration

mod once;
mod prices;
mod run;

pub use once::OnceArgs;
pub use prices::PricesArgs;
pub use run::RunArgs;

use crate::config::Config;
use crate::notify::{DiscordClient, DiscordClientConfig, TargetDispatcher};
use crate::price::{CoinGeckoClient, CoinGeckoConfig, QuoteFetcher, RetryPolicy};
use crate::sync::SyncScheduler;
use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "price-ticker")]
#[command(about = "Keeps Discord channels in sync with CoinGecko token prices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start scheduled updates until Ctrl-C
    Run(RunArgs),
    /// Run one sync cycle and exit
    Once(OnceArgs),
    /// Fetch and print prices without touching Discord
    Prices(PricesArgs),
    /// Show the effective configuration
    Config,
}

pub type LiveScheduler = SyncScheduler<CoinGeckoClient, DiscordClient>;

/// CoinGecko backed fetcher using the `[pricing]` settings
pub fn price_fetcher(config: &Config) -> anyhow::Result<QuoteFetcher<CoinGeckoClient>> {
    let client = CoinGeckoClient::with_config(CoinGeckoConfig::from(&config.pricing))
        .context("Failed to build CoinGecko client")?;

    Ok(QuoteFetcher::new(client, RetryPolicy::from(&config.pricing)).batched(config.pricing.batch))
}

/// Discord backed dispatcher using the `[discord]` settings
pub fn target_dispatcher(config: &Config) -> anyhow::Result<TargetDispatcher<DiscordClient>> {
    let token = config.bot_token()?;
    let client = DiscordClient::new(DiscordClientConfig::from_config(&config.discord, token))
        .context("Failed to build Discord client")?;

    Ok(TargetDispatcher::from_config(client, &config.discord))
}

pub fn live_scheduler(config: &Config) -> anyhow::Result<LiveScheduler> {
    Ok(SyncScheduler::new(
        price_fetcher(config)?,
        target_dispatcher(config)?,
        config,
    ))
}
