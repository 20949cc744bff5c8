//! Prometheus metrics for spin activity.
//!
//! Recording is a no-op until a recorder is installed with
//! [`install_prometheus`].

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Accepted spin requests counter metric name.
pub const METRIC_SPINS_STARTED: &str = "spins_started_total";
/// Unspin requests counter metric name.
pub const METRIC_UNSPINS: &str = "unspins_total";
/// Fired auto-stop timers counter metric name.
pub const METRIC_TIMER_EXPIRATIONS: &str = "timer_expirations_total";
/// Rejected spin requests counter metric name.
pub const METRIC_SPIN_REQUESTS_REJECTED: &str = "spin_requests_rejected_total";
/// Running spin loops gauge metric name.
pub const METRIC_SPIN_LOOPS_ACTIVE: &str = "spin_loops_active";
/// Armed auto-stop timers gauge metric name.
pub const METRIC_SPIN_TIMERS_ACTIVE: &str = "spin_timers_active";
/// Spin loop lifetime metric name.
pub const METRIC_SPIN_LOOP_DURATION: &str = "spin_loop_duration_ms";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(METRIC_SPINS_STARTED, "Total number of accepted spin requests");
    describe_counter!(METRIC_UNSPINS, "Total number of unspin requests");
    describe_counter!(
        METRIC_TIMER_EXPIRATIONS,
        "Total number of auto-stop timers that fired"
    );
    describe_counter!(
        METRIC_SPIN_REQUESTS_REJECTED,
        "Total number of spin requests rejected"
    );

    describe_gauge!(METRIC_SPIN_LOOPS_ACTIVE, "Spin loops currently running");
    describe_gauge!(METRIC_SPIN_TIMERS_ACTIVE, "Auto-stop timers currently armed");

    describe_histogram!(
        METRIC_SPIN_LOOP_DURATION,
        "Time a spin loop ran before exiting, in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Increment accepted spins counter.
pub fn inc_spins_started() {
    counter!(METRIC_SPINS_STARTED).increment(1);
}

/// Increment unspins counter.
pub fn inc_unspins() {
    counter!(METRIC_UNSPINS).increment(1);
}

/// Increment fired timers counter.
pub fn inc_timer_expirations() {
    counter!(METRIC_TIMER_EXPIRATIONS).increment(1);
}

/// Increment rejected spin requests counter.
pub fn inc_spin_requests_rejected(reason: &'static str) {
    counter!(METRIC_SPIN_REQUESTS_REJECTED, "reason" => reason).increment(1);
}

/// Set an active task gauge.
pub fn set_active_tasks(metric_name: &'static str, count: u64) {
    gauge!(metric_name).set(count as f64);
}

/// Record how long a spin loop ran.
pub fn record_spin_loop_duration(start: Instant) {
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SPIN_LOOP_DURATION).record(duration_ms);
}
