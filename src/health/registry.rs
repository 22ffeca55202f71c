//! Ordered probe registry.
//!
//! # Design Decisions
//! - Insertion order is the order of `details` in every report
//! - The list lives behind `ArcSwap`; a run loads one snapshot and is never
//!   affected by later `add`/`clear` calls

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::health::probe::Probe;

/// Frozen view of the registry taken at the start of a run.
pub type ProbeSnapshot = Arc<Vec<Arc<Probe>>>;

/// Ordered collection of registered probes.
pub struct ProbeRegistry {
    probes: ArcSwap<Vec<Arc<Probe>>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            probes: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a probe (FIFO).
    pub fn add(&self, probe: Probe) {
        let probe = Arc::new(probe);
        self.probes.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(probe.clone());
            next
        });
    }

    /// Remove every registered probe.
    pub fn clear(&self) {
        self.probes.store(Arc::new(Vec::new()));
    }

    pub fn snapshot(&self) -> ProbeSnapshot {
        self.probes.load_full()
    }

    pub fn len(&self) -> usize {
        self.probes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
