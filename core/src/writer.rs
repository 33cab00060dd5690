//! Idempotent copies of single files and directories.

use std::fs;
use std::path::Path;

use filetime::FileTime;
use tracing::{debug, error, info};

use crate::error::{MirrorError, Result};
use crate::event::{MirrorTask, TaskKind};

/// What a successful mirror operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The destination directory was created.
    DirectoryCreated,

    /// The destination directory was already there.
    DirectoryExisted,

    /// The file was copied; carries the number of bytes written.
    FileCopied(u64),
}

/// Execute a task and log the outcome.
pub fn mirror(task: &MirrorTask) -> Result<MirrorOutcome> {
    let result = match task.kind {
        TaskKind::Directory => mirror_directory(&task.destination),
        TaskKind::File => mirror_file(&task.source, &task.destination),
    };

    match &result {
        Ok(MirrorOutcome::DirectoryCreated) => {
            info!(
                "Created directory '{}' for '{}'",
                task.destination.display(),
                task.source.display()
            );
        }
        Ok(MirrorOutcome::DirectoryExisted) => {
            debug!(
                "Directory '{}' for '{}' already exists",
                task.destination.display(),
                task.source.display()
            );
        }
        Ok(MirrorOutcome::FileCopied(_)) => {
            info!(
                "Copied '{}' to '{}'",
                task.source.display(),
                task.destination.display()
            );
        }
        Err(e) => {
            error!(
                "Error mirroring '{}' to '{}': {e}",
                task.source.display(),
                task.destination.display()
            );
        }
    }

    result
}

/// Create `destination` and its ancestors unless it already exists.
pub fn mirror_directory(destination: &Path) -> Result<MirrorOutcome> {
    if destination.is_dir() {
        return Ok(MirrorOutcome::DirectoryExisted);
    }

    // create_dir_all succeeds if another writer created it meanwhile.
    fs::create_dir_all(destination).map_err(|cause| MirrorError::CreateDir {
        path: destination.to_path_buf(),
        cause,
    })?;
    Ok(MirrorOutcome::DirectoryCreated)
}

/// Copy `source` over `destination`, keeping access and modification times.
pub fn mirror_file(source: &Path, destination: &Path) -> Result<MirrorOutcome> {
    if let Some(parent) = destination.parent() {
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|cause| MirrorError::CreateDir {
                path: parent.to_path_buf(),
                cause,
            })?;
        }
    }

    let copy_error = |cause| MirrorError::Copy {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        cause,
    };

    let bytes = fs::copy(source, destination).map_err(copy_error)?;
    let metadata = fs::metadata(source).map_err(copy_error)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
    .map_err(copy_error)?;

    Ok(MirrorOutcome::FileCopied(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_directory_mirror_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out/a/b");

        assert_eq!(
            mirror_directory(&destination).unwrap(),
            MirrorOutcome::DirectoryCreated
        );
        assert_eq!(
            mirror_directory(&destination).unwrap(),
            MirrorOutcome::DirectoryExisted
        );

        let entries: Vec<_> = fs::read_dir(dir.path().join("out/a")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(destination.is_dir());
    }

    #[test]
    fn test_directory_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("taken");
        fs::write(&destination, b"file").unwrap();

        let err = mirror_directory(&destination).unwrap_err();
        assert!(matches!(err, MirrorError::CreateDir { .. }));
    }

    #[test]
    fn test_file_copy_creates_parents_and_keeps_mtime() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src/report.csv");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"a,b,c\n1,2,3\n").unwrap();

        let mtime = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(86_400));
        filetime::set_file_mtime(&source, mtime).unwrap();

        let destination = dir.path().join("dst/deep/er/report.csv");
        let outcome = mirror_file(&source, &destination).unwrap();

        assert_eq!(outcome, MirrorOutcome::FileCopied(12));
        assert_eq!(fs::read(&destination).unwrap(), b"a,b,c\n1,2,3\n");
        let source_meta = fs::metadata(&source).unwrap();
        let copied = fs::metadata(&destination).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&copied),
            FileTime::from_last_modification_time(&source_meta)
        );
        assert_eq!(
            FileTime::from_last_modification_time(&copied).unix_seconds(),
            mtime.unix_seconds()
        );
    }

    #[test]
    fn test_file_copy_overwrites() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        let destination = dir.path().join("b.txt");
        fs::write(&source, b"new").unwrap();
        fs::write(&destination, b"older and longer").unwrap();

        mirror_file(&source, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"new");
    }

    #[test]
    fn test_missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let task = MirrorTask {
            kind: TaskKind::File,
            source: dir.path().join("vanished.txt"),
            destination: dir.path().join("out/vanished.txt"),
        };

        let err = mirror(&task).unwrap_err();
        assert!(matches!(err, MirrorError::Copy { .. }));
        assert!(!task.destination.exists());
    }

    #[test]
    fn test_mirror_dispatches_on_kind() {
        let dir = TempDir::new().unwrap();
        let task = MirrorTask {
            kind: TaskKind::Directory,
            source: dir.path().join("src/sub"),
            destination: dir.path().join("dst/sub"),
        };

        assert_eq!(mirror(&task).unwrap(), MirrorOutcome::DirectoryCreated);
        assert!(task.destination.is_dir());
    }
}
