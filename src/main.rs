use anyhow::Context;
use clap::Parser;
use price_ticker::cli::{Cli, Commands};
use price_ticker::config::{Config, ConfigError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(ConfigError::Io(e)) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::parse(include_str!("../config.toml.example"))
                .context("Invalid default config")?
        }
        Err(e) => return Err(e).with_context(|| format!("Invalid config {}", cli.config)),
    };
    config.apply_env();

    match &cli.command {
        Commands::Prices(_) => config.validate_pricing()?,
        _ => config.validate()?,
    }

    // Initialize telemetry
    price_ticker::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting scheduled updates");
            args.execute(&config).await?;
        }
        Commands::Once(args) => {
            tracing::info!("Running a single cycle");
            args.execute(&config).await?;
        }
        Commands::Prices(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Pricing: {} (attempts={}, delay={}s, batch={})",
                config.pricing.base_url,
                config.pricing.max_attempts,
                config.pricing.retry_delay_secs,
                config.pricing.batch
            );
            println!(
                "  Discord: {} (format={:?}, token={})",
                config.discord.api_base,
                config.discord.message_format,
                if config.discord.bot_token.is_some() {
                    "set"
                } else {
                    "missing"
                }
            );
            println!(
                "  Schedule: enabled={}, every {}s",
                config.schedule.enabled, config.schedule.interval_secs
            );
            println!(
                "  Server: enabled={}, port={}",
                config.server.enabled, config.server.port
            );
            println!("  Targets ({:?}):", config.targets.mode);
            for target in &config.targets.list {
                println!("    {} {}", target.id, target.kind);
            }
            println!("  Tokens:");
            for token in &config.tokens {
                println!("    {} {} {}", token.emoji, token.symbol, token.id);
            }
        }
    }

    Ok(())
}
