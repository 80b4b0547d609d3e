//! Prices command implementation

use super::price_fetcher;
use crate::config::Config;
use crate::plan::render_text;
use crate::price::FetchOutcome;
use clap::Args;
use std::collections::BTreeMap;

#[derive(Args, Debug)]
pub struct PricesArgs {
    /// Print raw quotes as JSON
    #[arg(long)]
    pub json: bool,
}

impl PricesArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let quotes = match price_fetcher(config)?.fetch(&config.token_ids()).await {
            FetchOutcome::Success(quotes) => quotes,
            FetchOutcome::Failure(e) => anyhow::bail!("Price fetch failed: {}", e),
        };

        if self.json {
            let sorted: BTreeMap<_, _> = quotes.iter().collect();
            println!("{}", serde_json::to_string_pretty(&sorted)?);
            return Ok(());
        }

        for token in &config.tokens {
            match quotes.get(&token.id) {
                Some(quote) => println!("{}", render_text(token, quote)),
                None => println!("{} {}: unavailable", token.emoji, token.symbol),
            }
        }
        Ok(())
    }
}
