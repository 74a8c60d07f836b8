//! Prometheus metrics for upstream calls and sweeps.
//!
//! This module provides metrics for:
//! - Upstream call latency and failures
//! - Sweep steps, fallbacks, completions and aborts
//! - Sweep duration

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Upstream call latency metric name.
pub const METRIC_UPSTREAM_LATENCY: &str = "upstream_call_latency_ms";
/// Upstream failures counter metric name.
pub const METRIC_UPSTREAM_FAILURES: &str = "upstream_failures_total";
/// Sweep duration metric name.
pub const METRIC_SWEEP_DURATION: &str = "sweep_duration_ms";
/// Sweep steps counter metric name.
pub const METRIC_SWEEP_STEPS: &str = "sweep_steps_total";
/// Sweep fallback substitutions counter metric name.
pub const METRIC_SWEEP_FALLBACKS: &str = "sweep_fallbacks_total";
/// Completed sweeps counter metric name.
pub const METRIC_SWEEPS_COMPLETED: &str = "sweeps_completed_total";
/// Aborted sweeps counter metric name.
pub const METRIC_SWEEPS_ABORTED: &str = "sweeps_aborted_total";

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Can only succeed once per process.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_UPSTREAM_LATENCY,
        "Upstream computation call latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SWEEP_DURATION,
        "Total parameter sweep duration in milliseconds"
    );

    describe_counter!(
        METRIC_UPSTREAM_FAILURES,
        "Total number of failed upstream calls, by failure kind"
    );
    describe_counter!(METRIC_SWEEP_STEPS, "Total number of sweep points evaluated");
    describe_counter!(
        METRIC_SWEEP_FALLBACKS,
        "Total number of sweep points answered by the offline estimator after an upstream failure"
    );
    describe_counter!(
        METRIC_SWEEPS_COMPLETED,
        "Total number of sweeps that returned a full result set"
    );
    describe_counter!(
        METRIC_SWEEPS_ABORTED,
        "Total number of sweeps aborted on an upstream failure"
    );

    debug!("Metrics initialized");
}

/// Record upstream call latency.
pub fn record_upstream_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_UPSTREAM_LATENCY).record(latency_ms);
}

/// Increment upstream failures counter.
pub fn inc_upstream_failures(kind: &'static str) {
    counter!(METRIC_UPSTREAM_FAILURES, "kind" => kind).increment(1);
}

/// Increment sweep steps counter.
pub fn inc_sweep_steps() {
    counter!(METRIC_SWEEP_STEPS).increment(1);
}

/// Increment sweep fallbacks counter.
pub fn inc_sweep_fallbacks() {
    counter!(METRIC_SWEEP_FALLBACKS).increment(1);
}

/// Increment completed sweeps counter.
pub fn inc_sweeps_completed() {
    counter!(METRIC_SWEEPS_COMPLETED).increment(1);
}

/// Increment aborted sweeps counter.
pub fn inc_sweeps_aborted() {
    counter!(METRIC_SWEEPS_ABORTED).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a whole sweep.
pub fn timer_sweep() -> LatencyTimer {
    LatencyTimer::new(METRIC_SWEEP_DURATION)
}
