//! Run coalescing: at most one run in flight.
//!
//! # Data Flow
//! ```text
//! trigger(cb)
//!     → lock run state, enqueue cb
//!     → run already active? return immediately
//!     → else mark active, spawn engine on a registry snapshot
//!
//! run finished
//!     → finalize reply
//!     → lock run state: drain queue + clear active flag together
//!     → invoke every drained cb with the same Arc<HealthReply>
//! ```
//!
//! # Design Decisions
//! - The mutex is only held for test-and-set and drain-and-reset, never
//!   across an await
//! - Callbacks run outside the lock, so a callback may trigger again and
//!   start a fresh run
//! - A run that unwinds or is cancelled still answers its queue, with an
//!   interrupted report, and frees the slot for the next run
//! - A panicking callback does not keep the others from their reply

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::health::engine::Engine;
use crate::health::registry::ProbeSnapshot;
use crate::health::report::{HealthReply, RunReport};
use crate::observability::metrics;

/// Receives the finalized result of a run.
pub type ReplyCallback = Box<dyn FnOnce(Arc<HealthReply>) + Send + 'static>;

#[derive(Default)]
struct RunState {
    active: bool,
    pending: Vec<ReplyCallback>,
}

/// Deduplicates concurrent trigger requests.
#[derive(Clone, Default)]
pub struct Coalescer {
    state: Arc<Mutex<RunState>>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.lock().active
    }

    /// Queue `callback` for the current or a new run.
    ///
    /// `start` is consulted only when no run is active; it provides the
    /// engine and the frozen probe list for the new run.
    pub fn trigger<F>(&self, callback: ReplyCallback, start: F)
    where
        F: FnOnce() -> (Engine, ProbeSnapshot),
    {
        {
            let mut state = self.lock();
            state.pending.push(callback);
            if state.active {
                tracing::debug!(waiting = state.pending.len(), "Joined in-flight health run");
                return;
            }
            state.active = true;
        }

        // From here on the queue must be answered, whatever happens to the run.
        let guard = RunGuard {
            coalescer: self.clone(),
            done: false,
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "No Tokio runtime available to start a health run");
                return;
            }
        };

        let (engine, probes) = start();
        runtime.spawn(async move {
            let mut guard = guard;
            let report = engine.run(probes.as_slice()).await;
            let reply = Arc::new(HealthReply::from_report(&report));
            guard.done = true;
            guard.coalescer.finish(reply, engine.is_silent());
        });
    }

    fn finish(&self, reply: Arc<HealthReply>, silent: bool) {
        let queue = {
            let mut state = self.lock();
            state.active = false;
            std::mem::take(&mut state.pending)
        };

        let count = queue.len();
        for callback in queue {
            let reply = reply.clone();
            if panic::catch_unwind(AssertUnwindSafe(move || callback(reply))).is_err() {
                tracing::error!("Health run callback panicked");
            }
        }

        metrics::record_callers(count);
        if !silent {
            tracing::info!(callers = count, status = %reply.status, "Responded to health requests");
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A panicking callback never holds the lock, so poisoning is benign.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Answers the queue with an interrupted report if a run ends without
/// finishing (panic, cancelled task, no runtime).
struct RunGuard {
    coalescer: Coalescer,
    done: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        tracing::warn!("Health run ended without a result");
        let reply = Arc::new(HealthReply::from_report(&RunReport::interrupted()));
        self.coalescer.finish(reply, false);
    }
}
