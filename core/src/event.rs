//! Notifications, mirror tasks and reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::event::{CreateKind, ModifyKind};
use serde::{Deserialize, Serialize};

use crate::binding::WatchBinding;
use crate::error::Result;
use crate::initial::InitialCopyStats;

/// Kind of raw notification the mirror reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A file or directory was created.
    Created,

    /// A file or directory was modified.
    Modified,
}

impl NotificationKind {
    /// Map a notify event kind. Renames, removals and accesses are not mirrored.
    pub fn from_notify(kind: notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(ModifyKind::Name(_)) => None,
            notify::EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}

/// A change notification delivered by the watch subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNotification {
    /// What happened.
    pub kind: NotificationKind,

    /// Absolute path of the affected node.
    pub path: PathBuf,

    /// Whether the node is a directory.
    pub is_directory: bool,

    /// When the notification was received.
    pub observed_at: DateTime<Utc>,
}

impl RawNotification {
    /// Create a notification observed now.
    pub fn new(kind: NotificationKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            is_directory,
            observed_at: Utc::now(),
        }
    }

    /// Build notifications from a notify event, one per affected path.
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        let Some(kind) = NotificationKind::from_notify(event.kind) else {
            return Vec::new();
        };
        let folder_hint = matches!(event.kind, notify::EventKind::Create(CreateKind::Folder));

        event
            .paths
            .iter()
            .map(|path| Self::new(kind, path, folder_hint || path.is_dir()))
            .collect()
    }

    /// Human-readable detection message.
    pub fn describe(&self) -> String {
        let node = if self.is_directory { "directory" } else { "file" };
        match self.kind {
            NotificationKind::Created => format!("New {node} detected: {}", self.path.display()),
            NotificationKind::Modified => {
                format!("Modified {node} detected: {}", self.path.display())
            }
        }
    }
}

/// Kind of node a mirror task replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    File,
    Directory,
}

/// One copy to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTask {
    pub kind: TaskKind,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl MirrorTask {
    /// Derive the task for a source path owned by `binding`.
    pub fn for_path(binding: &WatchBinding, source: &Path, kind: TaskKind) -> Result<Self> {
        Ok(Self {
            kind,
            source: source.to_path_buf(),
            destination: binding.destination_for(source)?,
        })
    }
}

/// Why the debouncer or settle check dropped a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another event for the path was accepted within the quiet window.
    Debounced,

    /// The file's modification time was older than the settle delay allows.
    SettleDelay,
}

/// Structured record of one decision or outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MirrorReport {
    /// The debouncer accepted a notification received at `observed_at`.
    Accepted {
        path: PathBuf,
        observed_at: DateTime<Utc>,
    },

    /// A notification was dropped without copying.
    Skipped { path: PathBuf, reason: SkipReason },

    /// A notification could not be turned into a task, or its settle check failed.
    Dropped { path: PathBuf, error: String },

    /// A task completed.
    Mirrored { task: MirrorTask },

    /// A task failed.
    Failed { task: MirrorTask, error: String },

    /// The contents of a newly created directory were mirrored.
    SubtreeCopied {
        path: PathBuf,
        stats: InitialCopyStats,
    },
}

impl MirrorReport {
    /// Source path this report is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::Accepted { path, .. }
            | Self::Skipped { path, .. }
            | Self::Dropped { path, .. }
            | Self::SubtreeCopied { path, .. } => path,
            Self::Mirrored { task } | Self::Failed { task, .. } => &task.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notify_kind_mapping() {
        use notify::EventKind;

        assert_eq!(
            NotificationKind::from_notify(EventKind::Create(CreateKind::File)),
            Some(NotificationKind::Created)
        );
        assert_eq!(
            NotificationKind::from_notify(EventKind::Modify(ModifyKind::Data(DataChange::Any))),
            Some(NotificationKind::Modified)
        );
        assert_eq!(
            NotificationKind::from_notify(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            None
        );
        assert_eq!(
            NotificationKind::from_notify(EventKind::Remove(RemoveKind::File)),
            None
        );
        assert_eq!(
            NotificationKind::from_notify(EventKind::Access(AccessKind::Any)),
            None
        );
    }

    #[test]
    fn test_folder_hint_marks_directory() {
        let event = notify::Event::new(notify::EventKind::Create(CreateKind::Folder))
            .add_path(PathBuf::from("/does/not/exist/dir"));

        let notifications = RawNotification::from_notify(&event);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].is_directory);
        assert_eq!(notifications[0].kind, NotificationKind::Created);
    }

    #[test]
    fn test_describe() {
        let created = RawNotification::new(NotificationKind::Created, "/src/a.txt", false);
        assert_eq!(created.describe(), "New file detected: /src/a.txt");

        let modified = RawNotification::new(NotificationKind::Modified, "/src/dir", true);
        assert_eq!(modified.describe(), "Modified directory detected: /src/dir");
    }

    #[test]
    fn test_task_for_path() {
        let binding = WatchBinding::new("/a", "/b");
        let task = MirrorTask::for_path(&binding, Path::new("/a/x/y.txt"), TaskKind::File).unwrap();

        assert_eq!(task.destination, PathBuf::from("/b/x/y.txt"));
        assert_eq!(task.kind, TaskKind::File);
    }

    #[test]
    fn test_report_serializes_with_tag() {
        let report = MirrorReport::Skipped {
            path: PathBuf::from("/a/f"),
            reason: SkipReason::Debounced,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["type"], "skipped");
        assert_eq!(json["reason"], "debounced");
    }
}
