//! Run command implementation

use super::live_scheduler;
use crate::config::Config;
use crate::server;
use anyhow::Context;
use clap::Args;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Do not start the liveness server
    #[arg(long)]
    pub no_server: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let scheduler = live_scheduler(config)?;
        let shutdown = CancellationToken::new();

        let server = if config.server.enabled && !self.no_server {
            let listener = server::bind(config.server.port)
                .await
                .with_context(|| format!("Failed to bind port {}", config.server.port))?;
            Some(tokio::spawn(server::serve(listener, shutdown.clone())))
        } else {
            None
        };

        tokio::spawn(shutdown_signal(shutdown.clone()));

        tracing::info!(
            tokens = config.tokens.len(),
            targets = config.targets.list.len(),
            mode = ?config.targets.mode,
            "Starting price ticker"
        );
        let result = scheduler.run(shutdown.clone()).await;

        // Stop the server whether the scheduler ended cleanly or not
        shutdown.cancel();
        if let Some(handle) = server {
            handle.await?.context("Liveness server failed")?;
        }

        result.context("Discord login failed")?;
        Ok(())
    }
}

async fn shutdown_signal(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Ctrl+C received, shutting down...");
            token.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
