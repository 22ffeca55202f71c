//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HealthConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs (content changed?) → loader.rs → validation.rs
//!     → HealthConfig sent to the server
//!     → probe set replaced, max runtime applied from the next run on
//! ```
//!
//! # Design Decisions
//! - Every field has a default, so an empty file is a valid config
//! - `endpoint.path` and `listener` are read once at startup
//! - A file that fails validation never replaces the running config

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{EndpointConfig, HealthConfig, ListenerConfig, ObservabilityConfig, ProbeConfig, ProbeKind};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
