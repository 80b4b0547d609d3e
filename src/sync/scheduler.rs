//! Periodic fetch, plan, dispatch scheduler

use super::types::{CycleReport, SchedulerState};
use crate::config::{Config, ScheduleConfig, TargetsConfig, TokenSpec};
use crate::notify::{DispatchError, NotificationSurface, TargetDispatcher};
use crate::plan::plan_updates;
use crate::price::{FetchOutcome, PriceSource, QuoteFetcher};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::Utc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Runs sync cycles on a fixed interval
///
/// Cycles execute inside a single task, so two cycles never overlap. The
/// interval is measured from the start of each cycle; ticks that fall
/// inside a long cycle are skipped rather than queued.
pub struct SyncScheduler<P, S> {
    fetcher: QuoteFetcher<P>,
    dispatcher: TargetDispatcher<S>,
    tokens: Vec<TokenSpec>,
    targets: TargetsConfig,
    schedule: ScheduleConfig,
    state: watch::Sender<SchedulerState>,
}

impl<P: PriceSource, S: NotificationSurface> SyncScheduler<P, S> {
    pub fn new(fetcher: QuoteFetcher<P>, dispatcher: TargetDispatcher<S>, config: &Config) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);

        Self {
            fetcher,
            dispatcher,
            tokens: config.tokens.clone(),
            targets: config.targets.clone(),
            schedule: config.schedule.clone(),
            state,
        }
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn dispatcher(&self) -> &TargetDispatcher<S> {
        &self.dispatcher
    }

    /// Wait for the ready handshake, then run cycles until `shutdown`
    ///
    /// Only a failed handshake is returned as an error; cycle failures are
    /// reported and the schedule continues.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DispatchError> {
        let identity = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            identity = self.dispatcher.ready() => identity?,
        };
        tracing::info!(
            bot = %identity.username,
            bot_id = %identity.id,
            "Logged in"
        );

        if self.schedule.enabled {
            self.run_schedule(&shutdown).await;
        } else {
            self.run_guarded(&shutdown).await;
            tracing::info!("Scheduled updates disabled, idle until shutdown");
            shutdown.cancelled().await;
        }

        self.set_state(SchedulerState::Idle);
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    async fn run_schedule(&self, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.schedule.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.schedule.interval_secs,
            "Scheduled updates started"
        );

        loop {
            // First tick completes immediately
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.run_guarded(shutdown).await {
                break;
            }
        }
    }

    /// Run one cycle unless shutdown fires first; false when cancelled
    async fn run_guarded(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, abandoning cycle");
                false
            }
            _ = self.run_cycle() => true,
        }
    }

    /// Run a single fetch, plan, dispatch cycle
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);
        self.cycle(cycle_id).instrument(span).await
    }

    async fn cycle(&self, cycle_id: Uuid) -> CycleReport {
        let started_at = Utc::now();
        let started = Instant::now();
        self.set_state(SchedulerState::Running);

        let ids: Vec<String> = self.tokens.iter().map(|t| t.id.clone()).collect();
        let outcome = self.fetcher.fetch(&ids).await;
        let plan = plan_updates(&outcome, &self.tokens, &self.targets);

        let (fetch_error, quoted) = match outcome {
            FetchOutcome::Success(quotes) => (None, quotes.len()),
            FetchOutcome::Failure(e) => {
                tracing::warn!(error = %e, "No prices this cycle, skipping updates");
                (Some(e), 0)
            }
        };

        if !plan.omitted.is_empty() {
            tracing::warn!(omitted = ?plan.omitted, "Tokens without usable quotes");
        }

        telemetry::set_gauge(GaugeMetric::PlannedUpdates, plan.len() as f64);
        telemetry::set_gauge(GaugeMetric::OmittedTokens, plan.omitted.len() as f64);

        let dispatch_started = Instant::now();
        let outcomes = self.dispatcher.dispatch(&plan.instructions).await;
        telemetry::record_latency(LatencyMetric::Dispatch, dispatch_started.elapsed());

        let report = CycleReport {
            cycle_id,
            started_at,
            fetch_error,
            quoted,
            plan,
            outcomes,
        };

        self.set_state(SchedulerState::Idle);
        telemetry::increment(CounterMetric::CycleCompleted);
        telemetry::record_latency(LatencyMetric::Cycle, started.elapsed());

        tracing::info!(
            quoted = report.quoted,
            planned = report.plan.len(),
            applied = report.applied(),
            unchanged = report.unchanged(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        report
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
        let running = if state == SchedulerState::Running { 1.0 } else { 0.0 };
        telemetry::set_gauge(GaugeMetric::CycleRunning, running);
    }
}
