//! Error types for directory mirroring.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while mirroring a directory tree.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Source directory not found.
    #[error("source directory '{0}' does not exist")]
    SourceNotFound(PathBuf),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Binding already registered.
    #[error("already mirroring: {0}")]
    AlreadyMirroring(PathBuf),

    /// Notification path does not live under the watched root.
    #[error("'{path}' is not under source root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Copying a node failed.
    #[error("failed to copy '{source_path}' to '{destination}': {cause}")]
    Copy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// Creating a destination directory failed.
    #[error("failed to create directory '{path}': {cause}")]
    CreateDir {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// Reading a file's modification time failed.
    #[error("failed to read modification time of '{path}': {cause}")]
    Timestamp {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parse error.
    #[error("invalid toml config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON config parse error.
    #[error("invalid json config: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
