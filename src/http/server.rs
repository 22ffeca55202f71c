//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Apply configuration reloads to the health registry
//! - Graceful shutdown

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::HealthConfig;
use crate::health::{checks, HealthRegistry, Status};
use crate::http::request::{request_id_middleware, RequestId};
use crate::lifecycle::ShutdownListener;

/// Errors from binding or serving the endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind the listener for `address`.
pub async fn bind(address: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: HealthRegistry,
    crit_status_code: Arc<AtomicU16>,
}

impl AppState {
    pub fn new(registry: HealthRegistry, crit_status_code: u16) -> Self {
        Self {
            registry,
            crit_status_code: Arc::new(AtomicU16::new(crit_status_code)),
        }
    }

    fn crit_status(&self) -> StatusCode {
        StatusCode::from_u16(self.crit_status_code.load(Ordering::Relaxed)).unwrap_or(StatusCode::OK)
    }
}

/// Push a (re)loaded configuration into the registry.
///
/// Replaces the probe set with the configured probes; runs already in
/// flight keep their snapshot.
pub fn apply_config(registry: &HealthRegistry, config: &HealthConfig) {
    registry.set_max_runtime(Duration::from_millis(config.endpoint.max_runtime_ms));
    registry.set_silent(config.observability.silent);
    registry.clear_probes();
    checks::register_configured(registry, &config.probes);
}

/// HTTP server exposing the health endpoint.
pub struct HealthServer {
    router: Router,
    state: AppState,
    config: HealthConfig,
}

impl HealthServer {
    /// Create a server for `registry`, applying `config` to it.
    ///
    /// Probes already registered on `registry` are replaced by the
    /// configured ones.
    pub fn new(config: HealthConfig, registry: HealthRegistry) -> Self {
        apply_config(&registry, &config);
        Self::with_registry(config, registry)
    }

    /// Create a server that leaves `registry`'s probes untouched.
    pub fn with_registry(config: HealthConfig, registry: HealthRegistry) -> Self {
        let state = AppState::new(registry, config.endpoint.crit_status_code);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &HealthConfig, state: AppState) -> Router {
        let path = config.endpoint.path.as_str();
        let running_path = format!("{}/running", path.trim_end_matches('/'));

        Router::new()
            .route(path, get(health_handler))
            .route(&running_path, get(running_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(request_id_middleware)),
            )
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<HealthConfig>,
        shutdown: ShutdownListener,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.endpoint.path,
            "Health endpoint starting"
        );

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                apply_config(&state.registry, &config);
                state
                    .crit_status_code
                    .store(config.endpoint.crit_status_code, Ordering::Relaxed);
                tracing::info!(
                    probes = config.probes.len(),
                    max_runtime_ms = config.endpoint.max_runtime_ms,
                    "Configuration reloaded"
                );
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        reloader.abort();
        tracing::info!("Health endpoint stopped");
        Ok(())
    }

    pub fn registry(&self) -> &HealthRegistry {
        &self.state.registry
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}

/// Runs (or joins) a health run and returns its serialized result.
async fn health_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let reply = state.registry.check().await;

    let code = if reply.status == Status::Crit {
        state.crit_status()
    } else {
        StatusCode::OK
    };

    tracing::debug!(
        request_id = %request_id,
        status = %reply.status,
        "Health check served"
    );

    (
        code,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body.clone(),
    )
        .into_response()
}

#[derive(Serialize)]
struct RunningStatus {
    running: bool,
    probes: usize,
}

async fn running_handler(State(state): State<AppState>) -> Json<RunningStatus> {
    Json(RunningStatus {
        running: state.registry.is_running(),
        probes: state.registry.probe_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let taken = bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        match bind(&address).await {
            Err(ServerError::Bind { address: reported, .. }) => assert_eq!(reported, address),
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_crit_status_falls_back_to_ok() {
        let state = AppState::new(HealthRegistry::new(), 42);
        assert_eq!(state.crit_status(), StatusCode::OK);

        let state = AppState::new(HealthRegistry::new(), 503);
        assert_eq!(state.crit_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_apply_config_replaces_probes() {
        let registry = HealthRegistry::new();
        registry.add_probe("programmatic", || async {
            crate::health::ProbeResult::Ok(serde_json::json!("ok"))
        });

        let mut config = HealthConfig::default();
        config.endpoint.max_runtime_ms = 1500;
        config.probes.push(crate::config::ProbeConfig {
            description: "db".into(),
            kind: crate::config::ProbeKind::Tcp,
            target: "127.0.0.1:5432".into(),
            critical: true,
            expect_status: None,
        });

        apply_config(&registry, &config);
        assert_eq!(registry.probe_count(), 1);
        assert_eq!(registry.max_runtime(), Duration::from_millis(1500));
    }
}
