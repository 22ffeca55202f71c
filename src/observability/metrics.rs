//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define health-run metrics (runs, latency, probe failures, coalescing)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `health_runs_total` (counter): completed runs by aggregate status
//! - `health_run_duration_seconds` (histogram): wall time of a run
//! - `health_probe_failures_total` (counter): failed probes by outcome status
//! - `health_probe_timeouts_total` (counter): probes cut off by the deadline
//! - `health_coalesced_callers_total` (counter): callers answered by a run
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - No per-probe labels: descriptions are free text and unbounded

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::Status;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_run(status: Status, duration: Duration) {
    counter!("health_runs_total", "status" => status.as_str()).increment(1);
    histogram!("health_run_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_probe_failure(status: Status) {
    counter!("health_probe_failures_total", "test_status" => status.as_str()).increment(1);
}

pub fn record_probe_timeout() {
    counter!("health_probe_timeouts_total").increment(1);
}

pub fn record_callers(count: usize) {
    counter!("health_coalesced_callers_total").increment(count as u64);
}
