//! HTTP endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (assign request ID)
//!     → health handler → HealthRegistry::check (coalesced run)
//!     → JSON body, 200 (or configured code when crit)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{apply_config, bind, AppState, HealthServer, ServerError};
