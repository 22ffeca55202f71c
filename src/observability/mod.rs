//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine / coalescer / endpoint
//!     → logging.rs (tracing subscriber: fmt or JSON lines on stdout)
//!     → metrics.rs (run, probe and caller counters via the `metrics` facade)
//!
//! Prometheus scrapes the exporter listener when metrics are enabled.
//! ```
//!
//! # Design Decisions
//! - `silent` mutes per-run info logs, never warnings
//! - Endpoint logs carry the request ID

pub mod logging;
pub mod metrics;
