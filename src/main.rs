//! Health-check aggregator service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 PROBE HEALTH                   │
//!   GET /cloud/health  │  ┌────────┐   ┌───────────┐   ┌────────────┐   │
//!   ───────────────────┼─▶│  http  │──▶│ coalescer │──▶│   engine   │   │
//!                      │  │ server │   │ (1 run in │   │ fan-out +  │   │
//!   JSON aggregate     │  │        │◀──│  flight)  │◀──│  deadline  │   │
//!   ◀──────────────────┼──│        │   └───────────┘   └─────┬──────┘   │
//!                      │  └────────┘                         │          │
//!                      │                               ┌─────▼──────┐   │
//!                      │  ┌────────┐  ┌─────────────┐  │  probes    │   │
//!                      │  │ config │  │observability│  │ tcp / http │   │
//!                      │  │+watcher│  │ logs+metrics│  └────────────┘   │
//!                      │  └────────┘  └─────────────┘                   │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use probe_health::config::{load_config, ConfigWatcher, HealthConfig};
use probe_health::http;
use probe_health::lifecycle::signals::forward_signals;
use probe_health::observability::{logging, metrics};
use probe_health::{HealthRegistry, HealthServer, Shutdown};

#[derive(Parser)]
#[command(name = "probe-health")]
#[command(about = "Aggregating health-check endpoint", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => HealthConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "probe-health starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.endpoint.path,
        max_runtime_ms = config.endpoint.max_runtime_ms,
        probes = config.probes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server for reloads to flow.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = http::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HealthServer::new(config, HealthRegistry::new());

    tokio::spawn(async move {
        forward_signals(&shutdown).await;
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
