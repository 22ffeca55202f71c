//! Run-scoped deadline broadcast.
//!
//! # Responsibilities
//! - Notify every in-flight probe of one run that the deadline elapsed
//! - Fire at most once per run
//!
//! # Design Decisions
//! - Built on a `watch` channel so listeners created after firing still
//!   observe the event
//! - The fire-once guard is a compare-and-set, not channel state
//! - Knows nothing about the registry or the coalescer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Broadcast primitive with a single event kind: "deadline elapsed".
#[derive(Clone)]
pub struct DeadlineSignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl DeadlineSignal {
    /// Create a signal that has not fired yet.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(SignalInner {
                fired: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Register interest in the deadline.
    pub fn subscribe(&self) -> DeadlineListener {
        DeadlineListener {
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Fire the signal.
    ///
    /// Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.inner.tx.send_replace(true);
        true
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

impl Default for DeadlineSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One probe invocation's subscription to the deadline.
pub struct DeadlineListener {
    rx: watch::Receiver<bool>,
}

impl DeadlineListener {
    /// Resolve once the deadline has elapsed.
    ///
    /// Never resolves if the signal is dropped without firing.
    pub async fn elapsed(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fire_once() {
        let signal = DeadlineSignal::new();
        assert!(!signal.is_fired());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_fired());
    }

    #[tokio::test]
    async fn test_all_listeners_notified() {
        let signal = DeadlineSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        let waiter = tokio::spawn(async move {
            a.elapsed().await;
            b.elapsed().await;
        });

        signal.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listeners should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_fired_signal() {
        let signal = DeadlineSignal::new();
        signal.fire();

        let mut late = signal.subscribe();
        tokio::time::timeout(Duration::from_millis(100), late.elapsed())
            .await
            .expect("late listener should resolve immediately");
    }

    #[tokio::test]
    async fn test_unfired_listener_stays_pending() {
        let signal = DeadlineSignal::new();
        let mut listener = signal.subscribe();
        let res = tokio::time::timeout(Duration::from_millis(50), listener.elapsed()).await;
        assert!(res.is_err());
    }
}
