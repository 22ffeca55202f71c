//! Probe definitions and the per-invocation lifecycle.
//!
//! # Lifecycle
//! ```text
//! idle → in-progress → completed   (probe future finished first)
//!                    → timed-out   (deadline signal fired first)
//! ```
//!
//! # Design Decisions
//! - Timing and resolution state live on the invocation, not the definition
//! - The probe future runs as its own task and is aborted on timeout
//! - A compare-and-set guard makes resolution exactly-once

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::health::report::{PANIC_MESSAGE, TIMEOUT_MESSAGE};
use crate::health::signal::DeadlineListener;

/// Outcome of a probe function: a success payload or an error value.
pub type ProbeResult = Result<Value, Value>;

/// Boxed future returned by a probe function.
pub type ProbeFuture = Pin<Box<dyn Future<Output = ProbeResult> + Send + 'static>>;

/// An asynchronous check that can be invoked any number of times.
pub trait ProbeFn: Send + Sync + 'static {
    fn call(&self) -> ProbeFuture;
}

impl<F, Fut> ProbeFn for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    fn call(&self) -> ProbeFuture {
        Box::pin(self())
    }
}

/// A registered probe. Immutable once created.
pub struct Probe {
    description: String,
    critical: bool,
    func: Box<dyn ProbeFn>,
    /// Number of invocations currently in progress (misuse detection).
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("description", &self.description)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}

impl Probe {
    pub fn new(description: impl Into<String>, critical: bool, func: impl ProbeFn) -> Self {
        Self {
            description: description.into(),
            critical,
            func: Box::new(func),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Run the probe until it completes or the deadline fires.
    pub async fn invoke(&self, mut deadline: DeadlineListener) -> Resolution {
        let _guard = InFlightGuard::enter(self);
        let invocation = Invocation::start();

        // Building the future runs caller code synchronously; a panic there
        // must not unwind into the engine.
        let future = match panic::catch_unwind(AssertUnwindSafe(|| self.func.call())) {
            Ok(future) => future,
            Err(_) => {
                tracing::warn!(probe = %self.description, "Probe panicked before starting");
                return Resolution {
                    result: Err(Value::from(PANIC_MESSAGE)),
                    elapsed: invocation.elapsed(),
                    timed_out: false,
                };
            }
        };
        let mut task = tokio::spawn(future);

        let resolution = tokio::select! {
            joined = &mut task => {
                match joined {
                    Ok(result) => invocation.resolve(result, false),
                    Err(e) if e.is_panic() => {
                        tracing::warn!(probe = %self.description, "Probe panicked");
                        invocation.resolve(Err(Value::from(PANIC_MESSAGE)), false)
                    }
                    Err(_) => invocation.resolve(Err(Value::from(TIMEOUT_MESSAGE)), true),
                }
            }
            _ = deadline.elapsed() => {
                task.abort();
                invocation.resolve(Err(Value::from(TIMEOUT_MESSAGE)), true)
            }
        };

        resolution.unwrap_or_else(|| Resolution {
            result: Err(Value::from(TIMEOUT_MESSAGE)),
            elapsed: invocation.elapsed(),
            timed_out: true,
        })
    }
}

/// Terminal state of one invocation.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub result: ProbeResult,
    pub elapsed: Duration,
    pub timed_out: bool,
}

/// Per-invocation state: start time and the exactly-once resolution guard.
struct Invocation {
    started: Instant,
    resolved: AtomicBool,
}

impl Invocation {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            resolved: AtomicBool::new(false),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns `None` if this invocation was already resolved.
    fn resolve(&self, result: ProbeResult, timed_out: bool) -> Option<Resolution> {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        Some(Resolution {
            result,
            elapsed: self.elapsed(),
            timed_out,
        })
    }
}

/// Tracks concurrent invocations of one definition.
struct InFlightGuard<'a> {
    probe: &'a Probe,
}

impl<'a> InFlightGuard<'a> {
    fn enter(probe: &'a Probe) -> Self {
        let previous = probe.in_flight.fetch_add(1, Ordering::AcqRel);
        if previous > 0 {
            tracing::warn!(
                probe = %probe.description,
                "Called run for probe while it was already running"
            );
        }
        Self { probe }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.probe.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
