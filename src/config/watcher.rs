//! Configuration file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! notify event on the parent directory
//!     → ignore events for other files
//!     → read file, skip if empty (truncated mid-write) or unchanged
//!     → parse + validate
//!     → send HealthConfig to the server (invalid files keep the old config)
//! ```
//!
//! # Design Decisions
//! - The parent directory is watched so editors that replace the file
//!   atomically keep triggering reloads
//! - Duplicate notifications for one write collapse into one reload

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::HealthConfig;

/// Watches one configuration file and publishes validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<HealthConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its reloads.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<HealthConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive for reloads to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(ToOwned::to_owned);
        let reloader = Reloader {
            path: self.path.clone(),
            last_content: Mutex::new(std::fs::read_to_string(&self.path).ok()),
            tx: self.update_tx,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(ToOwned::to_owned) == file_name);
                    if relevant && ours {
                        reloader.reload();
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last_content: Mutex<Option<String>>,
    tx: mpsc::UnboundedSender<HealthConfig>,
}

impl Reloader {
    fn reload(&self) {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Config file unreadable, keeping current configuration");
                return;
            }
        };

        // Writers truncate before writing; an empty read is a write in progress.
        if content.trim().is_empty() {
            tracing::debug!(path = ?self.path, "Config file empty, waiting for the write to finish");
            return;
        }

        {
            let mut last = self.last_content.lock().unwrap_or_else(|p| p.into_inner());
            if last.as_deref() == Some(content.as_str()) {
                return;
            }
            *last = Some(content.clone());
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = ?self.path, probes = config.probes.len(), "Config change detected");
                let _ = self.tx.send(config);
            }
            Err(e) => tracing::error!(
                path = ?self.path,
                error = %e,
                "Failed to reload config. Keeping current configuration."
            ),
        }
    }
}
