//! Health-check execution subsystem.
//!
//! # Data Flow
//! ```text
//! HealthRegistry::trigger / check
//!     → coalescer.rs (join in-flight run or start a new one)
//!     → registry.rs (freeze probe list for this run)
//!     → engine.rs (invoke all probes under one deadline)
//!         → probe.rs (per-invocation timing, exactly-once resolution)
//!         → signal.rs (deadline broadcast)
//!     → report.rs (sticky status fold, wire serialization)
//!     → every queued caller receives the same reply
//! ```
//!
//! # Design Decisions
//! - No process globals: each `HealthRegistry` is an independent instance
//! - Failures surface only through the aggregate status, never as errors
//! - Registry changes take effect on the next run

pub mod checks;
pub mod coalescer;
pub mod engine;
pub mod probe;
pub mod registry;
pub mod report;
pub mod signal;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

pub use coalescer::{Coalescer, ReplyCallback};
pub use engine::{Engine, DEFAULT_MAX_RUNTIME};
pub use probe::{Probe, ProbeFn, ProbeFuture, ProbeResult};
pub use registry::{ProbeRegistry, ProbeSnapshot};
pub use report::{HealthReply, ProbeOutcome, RunReport, Status, PANIC_MESSAGE, TIMEOUT_MESSAGE};
pub use signal::{DeadlineListener, DeadlineSignal};

/// Handle to one health-check instance: probes, run state and settings.
///
/// Cloning is cheap and every clone refers to the same instance.
#[derive(Clone)]
pub struct HealthRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    probes: ProbeRegistry,
    coalescer: Coalescer,
    max_runtime_ms: AtomicU64,
    silent: AtomicBool,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                probes: ProbeRegistry::new(),
                coalescer: Coalescer::new(),
                max_runtime_ms: AtomicU64::new(DEFAULT_MAX_RUNTIME.as_millis() as u64),
                silent: AtomicBool::new(false),
            }),
        }
    }

    /// Register a probe whose failure degrades the status to `warn`.
    pub fn add_probe(&self, description: impl Into<String>, probe: impl ProbeFn) {
        self.inner.probes.add(Probe::new(description, false, probe));
    }

    /// Register a probe whose failure forces the status to `crit`.
    pub fn add_critical_probe(&self, description: impl Into<String>, probe: impl ProbeFn) {
        self.inner.probes.add(Probe::new(description, true, probe));
    }

    pub fn clear_probes(&self) {
        self.inner.probes.clear();
    }

    pub fn probe_count(&self) -> usize {
        self.inner.probes.len()
    }

    /// Set the deadline applied to every subsequent run.
    pub fn set_max_runtime(&self, max_runtime: Duration) {
        let ms = max_runtime.as_millis().min(u64::MAX as u128) as u64;
        self.inner.max_runtime_ms.store(ms, Ordering::Relaxed);
    }

    pub fn max_runtime(&self) -> Duration {
        Duration::from_millis(self.inner.max_runtime_ms.load(Ordering::Relaxed))
    }

    /// Suppress informational run logs.
    pub fn set_silent(&self, silent: bool) {
        self.inner.silent.store(silent, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.inner.coalescer.is_running()
    }

    /// Request a run; `callback` receives the result of the run in flight or
    /// of a newly started one. Never blocks.
    pub fn trigger<F>(&self, callback: F)
    where
        F: FnOnce(Arc<HealthReply>) + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.coalescer.trigger(Box::new(callback), move || {
            let engine = Engine::new(Duration::from_millis(
                inner.max_runtime_ms.load(Ordering::Relaxed),
            ))
            .silent(inner.silent.load(Ordering::Relaxed));
            (engine, inner.probes.snapshot())
        });
    }

    /// Awaitable form of [`HealthRegistry::trigger`].
    pub async fn check(&self) -> Arc<HealthReply> {
        let (tx, rx) = oneshot::channel();
        self.trigger(move |reply| {
            let _ = tx.send(reply);
        });
        match rx.await {
            Ok(reply) => reply,
            Err(_) => Arc::new(HealthReply::from_report(&RunReport::interrupted())),
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
