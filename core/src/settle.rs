//! Settle-delay verification for files that are written slowly.

use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::{MirrorError, Result};

/// Slack added to the settle delay when comparing modification times.
///
/// Some filesystems store mtimes with one-second resolution.
pub const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Result of the post-delay modification time check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleVerdict {
    /// The file was written within the delay window; copy it.
    Settled,

    /// The last write is older than the window allows; skip the copy.
    Stale,
}

/// Judge a modification time observed `settle_delay` after the event.
pub fn judge(modified: SystemTime, now: SystemTime, settle_delay: Duration) -> SettleVerdict {
    // An mtime ahead of the clock counts as just written.
    let since_modified = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if since_modified > settle_delay + MTIME_TOLERANCE {
        SettleVerdict::Stale
    } else {
        SettleVerdict::Settled
    }
}

/// Read the modification time of `path`.
pub async fn modified_time(path: &Path) -> Result<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .map_err(|cause| MirrorError::Timestamp {
            path: path.to_path_buf(),
            cause,
        })
}

/// Wait for `settle_delay`, then check whether `path` should be copied.
pub async fn wait_and_verify(path: &Path, settle_delay: Duration) -> Result<SettleVerdict> {
    tokio::time::sleep(settle_delay).await;
    let modified = modified_time(path).await?;
    Ok(judge(modified, SystemTime::now(), settle_delay))
}
