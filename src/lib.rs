//! Health-check aggregator library.
//!
//! Register probes on a [`HealthRegistry`], then trigger runs directly or
//! expose them over HTTP with [`HealthServer`].

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::HealthConfig;
pub use health::{HealthRegistry, HealthReply, Status};
pub use http::HealthServer;
pub use lifecycle::Shutdown;
