//! Resolved source → destination pairs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DEFAULT_QUIET_WINDOW_SECS;
use crate::error::{MirrorError, Result};

/// One mirrored directory pair with its timing parameters.
///
/// Both roots are absolute. A binding never changes after it is built; the
/// service hands out shared references to every task that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    source_root: PathBuf,
    destination_root: PathBuf,
    settle_delay: Duration,
    quiet_window: Duration,
}

impl WatchBinding {
    /// Create a binding with no settle delay and the default quiet window.
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            settle_delay: Duration::ZERO,
            quiet_window: Duration::from_secs(DEFAULT_QUIET_WINDOW_SECS),
        }
    }

    /// Set the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the quiet window.
    pub fn with_quiet_window(mut self, window: Duration) -> Self {
        self.quiet_window = window;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// Map a path under the source root to its mirror under the destination root.
    pub fn destination_for(&self, source_path: &Path) -> Result<PathBuf> {
        let relative = source_path
            .strip_prefix(&self.source_root)
            .map_err(|_| MirrorError::OutsideRoot {
                path: source_path.to_path_buf(),
                root: self.source_root.clone(),
            })?;

        if relative.as_os_str().is_empty() {
            return Ok(self.destination_root.clone());
        }
        Ok(self.destination_root.join(relative))
    }
}
