//! Baseline copy of a whole source tree before watching starts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::binding::WatchBinding;
use crate::event::{MirrorTask, TaskKind};
use crate::writer;

/// Result of an initial copy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialCopyStats {
    /// Directories mirrored (created or already present).
    pub directories: usize,

    /// Files copied.
    pub files: usize,

    /// Nodes that could not be read or copied.
    pub failures: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

/// Walk the source tree in pre-order and mirror every node.
///
/// Failures are logged and counted; the walk always runs to completion.
pub fn initial_copy(binding: &WatchBinding) -> InitialCopyStats {
    info!(
        "Performing initial copy for '{}'",
        binding.source_root().display()
    );

    let stats = copy_subtree(binding, binding.source_root());
    info!(
        "Initial copy of '{}' finished in {}ms (directories: {}, files: {}, failures: {})",
        binding.source_root().display(),
        stats.duration_ms,
        stats.directories,
        stats.files,
        stats.failures
    );

    stats
}

/// Mirror every node below `root`, which must lie inside the binding's source.
///
/// `root` itself is not mirrored. Used for directories that appear while
/// watching, whose contents may predate the watch on them.
pub fn copy_subtree(binding: &WatchBinding, root: &Path) -> InitialCopyStats {
    let start = std::time::Instant::now();
    let mut stats = InitialCopyStats::default();

    let walker = WalkDir::new(root).min_depth(1).follow_links(false);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under '{}': {e}", root.display());
                stats.failures += 1;
                continue;
            }
        };

        // Links to directories are mirrored as directories but not descended.
        let is_dir = entry.file_type().is_dir()
            || (entry.path_is_symlink() && entry.path().is_dir());
        let kind = if is_dir {
            TaskKind::Directory
        } else {
            TaskKind::File
        };

        let task = match MirrorTask::for_path(binding, entry.path(), kind) {
            Ok(task) => task,
            Err(e) => {
                warn!("{e}");
                stats.failures += 1;
                continue;
            }
        };

        match (writer::mirror(&task), kind) {
            (Ok(_), TaskKind::Directory) => stats.directories += 1,
            (Ok(_), TaskKind::File) => stats.files += 1,
            (Err(_), _) => stats.failures += 1,
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_initial_copy_mirrors_tree() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        fs::create_dir_all(src.path().join("docs/drafts")).unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();
        fs::write(src.path().join("readme.md"), b"# hi").unwrap();
        fs::write(src.path().join("docs/drafts/one.txt"), b"one").unwrap();

        let binding = WatchBinding::new(src.path(), dst.path());
        let stats = initial_copy(&binding);

        assert_eq!(stats.directories, 3);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.failures, 0);
        assert!(dst.path().join("empty").is_dir());
        assert_eq!(fs::read(dst.path().join("readme.md")).unwrap(), b"# hi");
        assert_eq!(
            fs::read(dst.path().join("docs/drafts/one.txt")).unwrap(),
            b"one"
        );
    }

    #[test]
    fn test_initial_copy_is_repeatable() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub/a.txt"), b"a").unwrap();

        let binding = WatchBinding::new(src.path(), dst.path());
        initial_copy(&binding);
        fs::write(src.path().join("sub/a.txt"), b"changed").unwrap();
        let stats = initial_copy(&binding);

        assert_eq!(stats.failures, 0);
        assert_eq!(fs::read(dst.path().join("sub/a.txt")).unwrap(), b"changed");
    }

    #[test]
    fn test_initial_copy_of_empty_tree() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let stats = initial_copy(&WatchBinding::new(src.path(), dst.path()));
        assert_eq!(stats.directories + stats.files + stats.failures, 0);
    }

    #[test]
    fn test_copy_subtree_only_mirrors_below_root() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("a/b/c")).unwrap();
        fs::write(src.path().join("a/top.txt"), b"top").unwrap();
        fs::write(src.path().join("a/b/c/deep.txt"), b"deep").unwrap();
        fs::write(src.path().join("outside.txt"), b"no").unwrap();

        let binding = WatchBinding::new(src.path(), dst.path());
        let stats = copy_subtree(&binding, &src.path().join("a"));

        assert_eq!(stats.directories, 2);
        assert_eq!(stats.files, 2);
        assert_eq!(fs::read(dst.path().join("a/top.txt")).unwrap(), b"top");
        assert_eq!(fs::read(dst.path().join("a/b/c/deep.txt")).unwrap(), b"deep");
        assert!(!dst.path().join("outside.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_is_mirrored_as_directory() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(target.path().join("inner.txt"), b"inner").unwrap();
        std::os::unix::fs::symlink(target.path(), src.path().join("linked")).unwrap();

        let stats = initial_copy(&WatchBinding::new(src.path(), dst.path()));

        assert_eq!(stats.failures, 0);
        assert_eq!(stats.directories, 1);
        assert!(dst.path().join("linked").is_dir());
        assert!(!dst.path().join("linked/inner.txt").exists());
    }
}
