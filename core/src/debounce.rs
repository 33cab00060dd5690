//! Per-path quiet-window debouncing.
//!
//! Every binding owns one [`Debouncer`]. A notification is accepted when no
//! other notification for the same path was accepted within the quiet window;
//! the accepted timestamp is remembered in a bounded LRU table.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of a debounce check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First event for the path, or the quiet window has elapsed.
    Accepted,

    /// An event for the path was accepted less than one quiet window ago.
    Debounced,
}

/// Timestamp of the last accepted event, keyed by absolute source path.
pub struct PendingEventState {
    accepted: LruCache<PathBuf, Instant>,
}

impl PendingEventState {
    /// Create a table remembering at most `capacity` paths.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            accepted: LruCache::new(capacity),
        }
    }

    /// Time since the last accepted event for `path`, `None` if never seen.
    pub fn elapsed_since(&mut self, path: &Path, now: Instant) -> Option<Duration> {
        self.accepted
            .get(path)
            .map(|last| now.saturating_duration_since(*last))
    }

    /// Record an accepted event.
    pub fn record(&mut self, path: &Path, now: Instant) {
        self.accepted.put(path.to_path_buf(), now);
    }

    /// Number of remembered paths.
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Maximum number of remembered paths.
    pub fn capacity(&self) -> usize {
        self.accepted.cap().get()
    }
}

/// Quiet-window filter for one binding.
pub struct Debouncer {
    quiet_window: Duration,
    state: PendingEventState,
}

impl Debouncer {
    /// Create a debouncer. A zero capacity is raised to one.
    pub fn new(quiet_window: Duration, max_tracked_paths: usize) -> Self {
        let capacity = NonZeroUsize::new(max_tracked_paths).unwrap_or(NonZeroUsize::MIN);
        Self {
            quiet_window,
            state: PendingEventState::new(capacity),
        }
    }

    /// Check a notification for `path` received now.
    pub fn observe(&mut self, path: &Path) -> Decision {
        self.observe_at(path, Instant::now())
    }

    /// Check a notification for `path` received at `now`.
    pub fn observe_at(&mut self, path: &Path, now: Instant) -> Decision {
        if let Some(elapsed) = self.state.elapsed_since(path, now) {
            if elapsed < self.quiet_window {
                debug!(
                    "Debounced event for {} ({elapsed:?} since last accepted)",
                    path.display()
                );
                return Decision::Debounced;
            }
        }

        self.state.record(path, now);
        Decision::Accepted
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    pub fn state(&self) -> &PendingEventState {
        &self.state
    }
}
