//! Execution engine: one concurrent run over a frozen probe list.
//!
//! # Algorithm
//! ```text
//! empty list            → ok report, no timer, no tasks (still counted)
//! otherwise:
//!     start deadline timer (max_runtime)
//!     → invoke every probe concurrently under one DeadlineSignal
//!     → join until every invocation is terminal
//!        (timer fire → signal fires once → stragglers resolve as timed-out)
//!     → cancel timer
//!     → fold outcomes in registry order into a sticky status
//! ```
//!
//! # Design Decisions
//! - The engine never aborts the join early; timed-out is itself terminal
//! - Outcomes keep registry order regardless of completion order

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;

use crate::health::probe::{Probe, Resolution};
use crate::health::report::{ProbeOutcome, RunReport, Status};
use crate::health::signal::DeadlineSignal;
use crate::observability::metrics;

/// Default upper bound on the duration of one run.
pub const DEFAULT_MAX_RUNTIME: Duration = Duration::from_millis(25_000);

/// Runs a probe list to completion under a global deadline.
#[derive(Debug, Clone)]
pub struct Engine {
    max_runtime: Duration,
    silent: bool,
}

impl Engine {
    pub fn new(max_runtime: Duration) -> Self {
        Self {
            max_runtime,
            silent: false,
        }
    }

    /// Suppress informational run logs.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn max_runtime(&self) -> Duration {
        self.max_runtime
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Execute every probe and build the aggregate report.
    pub async fn run<P>(&self, probes: &[P]) -> RunReport
    where
        P: AsRef<Probe>,
    {
        let started = Instant::now();
        let report = if probes.is_empty() {
            RunReport::new()
        } else {
            self.run_probes(probes).await
        };

        metrics::record_run(report.status(), started.elapsed());
        report
    }

    async fn run_probes<P>(&self, probes: &[P]) -> RunReport
    where
        P: AsRef<Probe>,
    {
        tracing::debug!(
            probes = probes.len(),
            max_runtime_ms = self.max_runtime.as_millis() as u64,
            "Starting health run"
        );

        let signal = DeadlineSignal::new();
        let timer = {
            let signal = signal.clone();
            let max_runtime = self.max_runtime;
            tokio::spawn(async move {
                tokio::time::sleep(max_runtime).await;
                if signal.fire() {
                    tracing::warn!(
                        max_runtime_ms = max_runtime.as_millis() as u64,
                        "Health run deadline elapsed, cancelling remaining probes"
                    );
                }
            })
        };

        let invocations = probes
            .iter()
            .map(|probe| probe.as_ref().invoke(signal.subscribe()));
        let resolutions = join_all(invocations).await;

        timer.abort();

        if signal.is_fired() && !self.silent {
            tracing::info!("Finished running all probes after timeout");
        }

        let mut report = RunReport::new();
        for (probe, resolution) in probes.iter().zip(resolutions) {
            report.record(fold_outcome(probe.as_ref(), resolution));
        }
        report
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RUNTIME)
    }
}

/// Map one invocation's resolution to its outcome.
fn fold_outcome(probe: &Probe, resolution: Resolution) -> ProbeOutcome {
    let Resolution {
        result,
        elapsed,
        timed_out,
    } = resolution;

    if timed_out {
        metrics::record_probe_timeout();
    }

    let (status, result): (Status, Value) = match result {
        Ok(payload) => (Status::Ok, payload),
        Err(error) => {
            let status = if probe.is_critical() {
                Status::Crit
            } else {
                Status::Warn
            };
            metrics::record_probe_failure(status);
            tracing::debug!(
                probe = %probe.description(),
                critical = probe.is_critical(),
                timed_out,
                "Probe failed"
            );
            (status, error)
        }
    };

    ProbeOutcome {
        description: probe.description().to_string(),
        status,
        result,
        runtime: elapsed,
    }
}
