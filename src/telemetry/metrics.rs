//! Prometheus metrics

use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// A pricing request was sent
    FetchAttempt,
    /// A pricing request was answered with 429
    FetchRateLimited,
    /// A fetch ended without usable quotes
    FetchFailed,
    /// A token was dropped for missing or invalid data
    QuoteRejected,
    /// An update instruction was applied
    DispatchApplied,
    /// An update instruction was skipped because nothing changed
    DispatchUnchanged,
    /// An update instruction failed
    DispatchFailed,
    /// A full cycle completed
    CycleCompleted,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// 1 while a cycle is running, 0 while idle
    CycleRunning,
    /// Instructions produced by the last plan
    PlannedUpdates,
    /// Tokens omitted from the last plan
    OmittedTokens,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Pricing fetch including retries
    Fetch,
    /// Dispatch of a whole plan
    Dispatch,
    /// Whole fetch, plan, dispatch cycle
    Cycle,
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let name = match metric {
        CounterMetric::FetchAttempt => "ticker_fetch_attempts_total",
        CounterMetric::FetchRateLimited => "ticker_fetch_rate_limited_total",
        CounterMetric::FetchFailed => "ticker_fetch_failures_total",
        CounterMetric::QuoteRejected => "ticker_quotes_rejected_total",
        CounterMetric::DispatchApplied => "ticker_dispatch_applied_total",
        CounterMetric::DispatchUnchanged => "ticker_dispatch_unchanged_total",
        CounterMetric::DispatchFailed => "ticker_dispatch_failures_total",
        CounterMetric::CycleCompleted => "ticker_cycles_total",
    };

    metrics::counter!(name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::CycleRunning => "ticker_cycle_running",
        GaugeMetric::PlannedUpdates => "ticker_planned_updates",
        GaugeMetric::OmittedTokens => "ticker_omitted_tokens",
    };

    metrics::gauge!(name).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let name = match metric {
        LatencyMetric::Fetch => "ticker_fetch_duration_seconds",
        LatencyMetric::Dispatch => "ticker_dispatch_duration_seconds",
        LatencyMetric::Cycle => "ticker_cycle_duration_seconds",
    };

    metrics::histogram!(name).record(duration.as_secs_f64());
}
