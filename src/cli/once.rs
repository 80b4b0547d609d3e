//! Once command implementation

use super::{live_scheduler, price_fetcher};
use crate::config::Config;
use crate::notify::DispatchOutcome;
use crate::plan::{plan_updates, UpdatePlan};
use crate::price::FetchOutcome;
use crate::sync::CycleReport;
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Print the planned updates without applying them
    #[arg(long)]
    pub dry_run: bool,
}

impl OnceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if self.dry_run {
            let outcome = price_fetcher(config)?.fetch(&config.token_ids()).await;
            if let FetchOutcome::Failure(e) = &outcome {
                anyhow::bail!("Price fetch failed: {}", e);
            }
            print_plan(&plan_updates(&outcome, &config.tokens, &config.targets));
            return Ok(());
        }

        let scheduler = live_scheduler(config)?;
        let identity = scheduler
            .dispatcher()
            .ready()
            .await
            .context("Discord login failed")?;
        tracing::info!(bot = %identity.username, "Logged in");

        let report = scheduler.run_cycle().await;
        print_report(&report);

        if let Some(e) = &report.fetch_error {
            anyhow::bail!("Price fetch failed: {}", e);
        }
        Ok(())
    }
}

fn print_plan(plan: &UpdatePlan) {
    for instruction in &plan.instructions {
        println!(
            "{:<20} {:<6} {}",
            instruction.target.id,
            instruction.target.kind,
            instruction.text
        );
    }
    for token in &plan.omitted {
        println!("omitted: {}", token);
    }
}

fn print_report(report: &CycleReport) {
    println!("cycle {}", report.cycle_id);
    for (instruction, outcome) in report.entries() {
        let status = match outcome {
            DispatchOutcome::Applied => "applied".to_string(),
            DispatchOutcome::Unchanged => "unchanged".to_string(),
            DispatchOutcome::Failed { stage, error } => format!("failed ({:?}): {}", stage, error),
        };
        println!("{:<20} {:<40} {}", instruction.target.id, instruction.text, status);
    }
    for token in &report.plan.omitted {
        println!("omitted: {}", token);
    }
    println!(
        "applied={} unchanged={} failed={}",
        report.applied(),
        report.unchanged(),
        report.failed()
    );
}
