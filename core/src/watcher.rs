//! Live watching: notify adapter and the multi-binding mirror service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::binding::WatchBinding;
use crate::config::{BindingConfig, ServiceOptions};
use crate::error::{MirrorError, Result};
use crate::event::{MirrorReport, RawNotification};
use crate::initial::initial_copy;
use crate::session::MirrorSession;

/// Recursive notify watch over one source root.
///
/// Notifications are forwarded into a bounded channel; dropping the watcher
/// stops the backend and closes the channel.
pub struct BindingWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl BindingWatcher {
    /// Start watching `root` recursively.
    pub fn start(
        root: &Path,
        buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<RawNotification>)> {
        let (event_tx, event_rx) = mpsc::channel(buffer.max(1));

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for notification in RawNotification::from_notify(&event) {
                        if let Err(e) = event_tx.blocking_send(notification) {
                            debug!("Dropping notification after shutdown: {e}");
                        }
                    }
                }
                Err(e) => {
                    warn!("Watch error: {e}");
                }
            },
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        debug!("Started watching: {}", root.display());

        Ok((
            Self {
                watcher,
                root: root.to_path_buf(),
            },
            event_rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching.
    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            debug!("Failed to unwatch {}: {e}", self.root.display());
        }
    }
}

/// A binding with its watcher and event loop.
struct ActiveBinding {
    watcher: BindingWatcher,
    session: JoinHandle<()>,
}

/// Mirrors every registered binding until stopped.
pub struct MirrorService {
    /// Registered bindings.
    bindings: Arc<RwLock<Vec<Arc<WatchBinding>>>>,

    /// Running watchers.
    active: Vec<ActiveBinding>,

    /// Shared settings.
    options: ServiceOptions,

    /// Optional report sink.
    reports: Option<mpsc::UnboundedSender<MirrorReport>>,

    /// Whether the service is running.
    running: Arc<RwLock<bool>>,
}

impl MirrorService {
    /// Create a service with the given options.
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(Vec::new())),
            active: Vec::new(),
            options,
            reports: None,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Send a report for every decision and outcome to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<MirrorReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Register a resolved binding.
    pub async fn add(&mut self, binding: WatchBinding) -> Result<()> {
        let mut bindings = self.bindings.write().await;
        let duplicate = bindings.iter().any(|b| {
            b.source_root() == binding.source_root()
                && b.destination_root() == binding.destination_root()
        });
        if duplicate {
            return Err(MirrorError::AlreadyMirroring(
                binding.source_root().to_path_buf(),
            ));
        }

        info!(
            "Adding directory pair: '{}' -> '{}'",
            binding.source_root().display(),
            binding.destination_root().display()
        );
        bindings.push(Arc::new(binding));
        Ok(())
    }

    /// Resolve and register every configured pair, skipping invalid ones.
    ///
    /// Returns the number of pairs registered.
    pub async fn add_all(&mut self, configs: &[BindingConfig]) -> usize {
        let mut added = 0;
        for config in configs {
            let result = match config.resolve() {
                Ok(binding) => self.add(binding).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => added += 1,
                Err(e) => error!(
                    "Skipping pair '{}' -> '{}': {e}",
                    config.source.display(),
                    config.destination.display()
                ),
            }
        }
        added
    }

    /// Start mirroring all registered bindings.
    ///
    /// A binding whose watcher cannot be started is logged and skipped.
    pub async fn start(&mut self) -> Result<()> {
        if *self.running.read().await {
            return Ok(()); // Already running
        }

        let bindings = self.bindings.read().await.clone();
        for binding in bindings {
            if self.options.initial_copy {
                let walked = Arc::clone(&binding);
                if let Err(e) = tokio::task::spawn_blocking(move || initial_copy(&walked)).await {
                    error!(
                        "Initial copy of '{}' aborted: {e}",
                        binding.source_root().display()
                    );
                }
            }

            let (watcher, notifications) =
                match BindingWatcher::start(binding.source_root(), self.options.event_buffer) {
                    Ok(started) => started,
                    Err(e) => {
                        error!(
                            "Failed to watch {}: {e}",
                            binding.source_root().display()
                        );
                        continue;
                    }
                };

            let mut session = MirrorSession::new(binding, self.options.max_tracked_paths);
            if let Some(tx) = &self.reports {
                session = session.with_reports(tx.clone());
            }

            self.active.push(ActiveBinding {
                watcher,
                session: tokio::spawn(session.run(notifications)),
            });
        }

        if self.active.is_empty() {
            return Err(MirrorError::Config(
                "no directory pairs are being watched".to_string(),
            ));
        }

        *self.running.write().await = true;
        info!("Mirror service started ({} active)", self.active.len());
        Ok(())
    }

    /// Stop all watchers and wait for their event loops to drain.
    pub async fn stop(&mut self) {
        for active in self.active.drain(..) {
            active.watcher.stop();
            if let Err(e) = active.session.await {
                warn!("Mirror session ended abnormally: {e}");
            }
        }

        *self.running.write().await = false;
        info!("Mirror service stopped");
    }

    /// Check if the service is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Registered bindings.
    pub async fn bindings(&self) -> Vec<WatchBinding> {
        self.bindings
            .read()
            .await
            .iter()
            .map(|b| b.as_ref().clone())
            .collect()
    }

    /// Get statistics about the service.
    pub async fn stats(&self) -> MirrorStats {
        MirrorStats {
            configured_bindings: self.bindings.read().await.len(),
            active_bindings: self.active.len(),
        }
    }
}

/// Statistics about the mirror service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStats {
    /// Registered bindings.
    pub configured_bindings: usize,

    /// Bindings with a running watcher.
    pub active_bindings: usize,
}
