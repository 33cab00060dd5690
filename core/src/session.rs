//! Per-binding event loop: debounce, settle, copy.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crate::binding::WatchBinding;
use crate::debounce::{Debouncer, Decision};
use crate::event::{
    MirrorReport, MirrorTask, NotificationKind, RawNotification, SkipReason, TaskKind,
};
use crate::initial::copy_subtree;
use crate::settle::{self, SettleVerdict};
use crate::writer;

type ReportSender = Option<mpsc::UnboundedSender<MirrorReport>>;

/// Consumes the notifications of one binding and dispatches mirror tasks.
///
/// The debouncer is owned by the session, so the check-and-record step for
/// a path never races with another notification of the same binding. Copies
/// and settle delays run as separate tasks and never block the loop.
pub struct MirrorSession {
    binding: Arc<WatchBinding>,
    debouncer: Debouncer,
    reports: ReportSender,
}

impl MirrorSession {
    /// Create a session for `binding`.
    pub fn new(binding: Arc<WatchBinding>, max_tracked_paths: usize) -> Self {
        let debouncer = Debouncer::new(binding.quiet_window(), max_tracked_paths);
        Self {
            binding,
            debouncer,
            reports: None,
        }
    }

    /// Send a report for every decision and outcome to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<MirrorReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn binding(&self) -> &WatchBinding {
        &self.binding
    }

    /// Process notifications until the channel closes.
    pub async fn run(mut self, mut notifications: mpsc::Receiver<RawNotification>) {
        info!(
            "Watching directory: '{}' with output: '{}'",
            self.binding.source_root().display(),
            self.binding.destination_root().display()
        );

        while let Some(notification) = notifications.recv().await {
            self.handle(notification);
        }

        debug!(
            "Notification stream closed for '{}'",
            self.binding.source_root().display()
        );
    }

    /// Handle one notification. Returns the spawned copy task, if any.
    pub fn handle(&mut self, notification: RawNotification) -> Option<JoinHandle<()>> {
        info!("{}", notification.describe());

        let kind = if notification.is_directory {
            TaskKind::Directory
        } else {
            TaskKind::File
        };
        let task = match MirrorTask::for_path(&self.binding, &notification.path, kind) {
            Ok(task) => task,
            Err(e) => {
                warn!("Dropping notification: {e}");
                send(
                    &self.reports,
                    MirrorReport::Dropped {
                        path: notification.path,
                        error: e.to_string(),
                    },
                );
                return None;
            }
        };

        if self.debouncer.observe(&task.source) == Decision::Debounced {
            send(
                &self.reports,
                MirrorReport::Skipped {
                    path: task.source,
                    reason: SkipReason::Debounced,
                },
            );
            return None;
        }

        info!(
            "Accepted event for {} (observed at {})",
            task.source.display(),
            notification.observed_at.to_rfc3339()
        );
        send(
            &self.reports,
            MirrorReport::Accepted {
                path: task.source.clone(),
                observed_at: notification.observed_at,
            },
        );

        let reports = self.reports.clone();
        if kind == TaskKind::Directory {
            let binding = Arc::clone(&self.binding);
            let created = notification.kind == NotificationKind::Created;
            return Some(tokio::spawn(
                mirror_directory(binding, task, created, reports).in_current_span(),
            ));
        }

        let settle_delay = self.binding.settle_delay();
        if settle_delay.is_zero() {
            return Some(tokio::spawn(
                async move {
                    execute(task, reports).await;
                }
                .in_current_span(),
            ));
        }

        Some(tokio::spawn(
            async move {
                match settle::wait_and_verify(&task.source, settle_delay).await {
                    Ok(SettleVerdict::Settled) => {
                        execute(task, reports).await;
                    }
                    Ok(SettleVerdict::Stale) => {
                        info!(
                            "Settle delay skip for {}: last write is older than {settle_delay:?}",
                            task.source.display()
                        );
                        send(
                            &reports,
                            MirrorReport::Skipped {
                                path: task.source,
                                reason: SkipReason::SettleDelay,
                            },
                        );
                    }
                    Err(e) => {
                        error!("Dropping settle check: {e}");
                        send(
                            &reports,
                            MirrorReport::Dropped {
                                path: task.source,
                                error: e.to_string(),
                            },
                        );
                    }
                }
            }
            .in_current_span(),
        ))
    }
}

/// Mirror a directory. A newly created one may already hold entries made
/// before the watch on it was installed, so its contents are walked too.
async fn mirror_directory(
    binding: Arc<WatchBinding>,
    task: MirrorTask,
    created: bool,
    reports: ReportSender,
) {
    let root = task.source.clone();
    if !execute(task, reports.clone()).await || !created {
        return;
    }

    let walked = root.clone();
    match tokio::task::spawn_blocking(move || copy_subtree(&binding, &walked)).await {
        Ok(stats) => {
            if stats.directories + stats.files + stats.failures > 0 {
                info!(
                    "Mirrored contents of new directory '{}' (directories: {}, files: {}, failures: {})",
                    root.display(),
                    stats.directories,
                    stats.files,
                    stats.failures
                );
            }
            send(&reports, MirrorReport::SubtreeCopied { path: root, stats });
        }
        Err(e) => error!("Copy of new directory '{}' aborted: {e}", root.display()),
    }
}

/// Run one task on the blocking pool. Returns whether it succeeded.
async fn execute(task: MirrorTask, reports: ReportSender) -> bool {
    let copy = task.clone();
    let (succeeded, report) =
        match tokio::task::spawn_blocking(move || writer::mirror(&copy)).await {
            Ok(Ok(_)) => (true, MirrorReport::Mirrored { task }),
            Ok(Err(e)) => (
                false,
                MirrorReport::Failed {
                    task,
                    error: e.to_string(),
                },
            ),
            Err(e) => {
                error!("Mirror task for '{}' aborted: {e}", task.source.display());
                (
                    false,
                    MirrorReport::Failed {
                        task,
                        error: e.to_string(),
                    },
                )
            }
        };
    send(&reports, report);
    succeeded
}

fn send(reports: &ReportSender, report: MirrorReport) {
    if let Some(tx) = reports {
        // Nobody listening is fine.
        let _ = tx.send(report);
    }
}
