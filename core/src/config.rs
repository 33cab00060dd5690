//! Configuration types for directory mirroring.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binding::WatchBinding;
use crate::error::{MirrorError, Result};

/// Default quiet window between accepted events for one path.
pub const DEFAULT_QUIET_WINDOW_SECS: u64 = 2;

/// Default capacity of the per-binding pending event table.
pub const DEFAULT_MAX_TRACKED_PATHS: usize = 100_000;

/// Default capacity of the notification channel of each binding.
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Top-level mirror configuration, as read from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Copy every existing node before watching starts.
    #[serde(default = "default_initial_copy")]
    pub initial_copy: bool,

    /// Maximum number of paths remembered by each debouncer.
    #[serde(default = "default_max_tracked_paths")]
    pub max_tracked_paths: usize,

    /// Notification channel capacity per binding.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Directory pairs to mirror.
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl MirrorConfig {
    /// Create an empty configuration with default settings.
    pub fn new() -> Self {
        Self {
            initial_copy: default_initial_copy(),
            max_tracked_paths: default_max_tracked_paths(),
            event_buffer: default_event_buffer(),
            bindings: Vec::new(),
        }
    }

    /// Add a binding.
    pub fn with_binding(mut self, binding: BindingConfig) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Load a configuration file. Files ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_toml_str(&contents)?
        };

        info!(
            "Loaded {} directory pair(s) from {}",
            config.bindings.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse a TOML configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the service-level settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_tracked_paths == 0 {
            return Err(MirrorError::Config(
                "max_tracked_paths must be at least 1".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(MirrorError::Config(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Service options carried by this configuration.
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            initial_copy: self.initial_copy,
            max_tracked_paths: self.max_tracked_paths,
            event_buffer: self.event_buffer,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings shared by every binding of a running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub initial_copy: bool,
    pub max_tracked_paths: usize,
    pub event_buffer: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        MirrorConfig::new().service_options()
    }
}

/// One configured directory pair, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Directory to watch.
    pub source: PathBuf,

    /// Directory receiving the mirror.
    pub destination: PathBuf,

    /// Seconds to wait before verifying a modified file.
    #[serde(default)]
    pub settle_delay_secs: u64,

    /// Seconds during which repeated events for one path are dropped.
    #[serde(default = "default_quiet_window_secs")]
    pub quiet_window_secs: u64,
}

impl BindingConfig {
    /// Create a binding config with default timings.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            settle_delay_secs: 0,
            quiet_window_secs: DEFAULT_QUIET_WINDOW_SECS,
        }
    }

    /// Build a binding config from raw command-line arguments.
    pub fn from_args(source: &str, destination: &str) -> Self {
        Self::new(normalize_path_arg(source), normalize_path_arg(destination))
    }

    /// Set the settle delay in seconds.
    pub fn with_settle_delay_secs(mut self, secs: u64) -> Self {
        self.settle_delay_secs = secs;
        self
    }

    /// Set the quiet window in seconds.
    pub fn with_quiet_window_secs(mut self, secs: u64) -> Self {
        self.quiet_window_secs = secs;
        self
    }

    /// Validate the pair and produce a binding with absolute roots.
    ///
    /// The destination is created when missing.
    pub fn resolve(&self) -> Result<WatchBinding> {
        if !self.source.exists() {
            return Err(MirrorError::SourceNotFound(self.source.clone()));
        }
        if !self.source.is_dir() {
            return Err(MirrorError::NotADirectory(self.source.clone()));
        }
        let source_root = dunce::canonicalize(&self.source)?;

        if !self.destination.exists() {
            fs::create_dir_all(&self.destination).map_err(|cause| MirrorError::CreateDir {
                path: self.destination.clone(),
                cause,
            })?;
            info!("Created output directory: {}", self.destination.display());
        } else if !self.destination.is_dir() {
            return Err(MirrorError::NotADirectory(self.destination.clone()));
        }
        let destination_root = dunce::canonicalize(&self.destination)?;

        // Mirroring into the watched tree would feed every copy back as a new event.
        if destination_root.starts_with(&source_root) {
            return Err(MirrorError::Config(format!(
                "destination '{}' is inside source '{}'",
                destination_root.display(),
                source_root.display()
            )));
        }

        Ok(WatchBinding::new(source_root, destination_root)
            .with_settle_delay(Duration::from_secs(self.settle_delay_secs))
            .with_quiet_window(Duration::from_secs(self.quiet_window_secs)))
    }
}

/// Trim whitespace and trailing commas from a path argument.
pub fn normalize_path_arg(raw: &str) -> PathBuf {
    PathBuf::from(raw.trim().trim_end_matches(',').trim_end())
}

fn default_initial_copy() -> bool {
    true
}

fn default_max_tracked_paths() -> usize {
    DEFAULT_MAX_TRACKED_PATHS
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_quiet_window_secs() -> u64 {
    DEFAULT_QUIET_WINDOW_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_toml_config_defaults() {
        let config = MirrorConfig::from_toml_str(
            r#"
            [[bindings]]
            source = "/data/in"
            destination = "/data/out"

            [[bindings]]
            source = "/exports"
            destination = "/backup/exports"
            settle_delay_secs = 10
            quiet_window_secs = 5
            "#,
        )
        .unwrap();

        assert!(config.initial_copy);
        assert_eq!(config.max_tracked_paths, DEFAULT_MAX_TRACKED_PATHS);
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(
            config.bindings[0],
            BindingConfig::new("/data/in", "/data/out")
        );
        assert_eq!(config.bindings[1].settle_delay_secs, 10);
        assert_eq!(config.bindings[1].quiet_window_secs, 5);
    }

    #[test]
    fn test_json_config() {
        let config = MirrorConfig::from_json_str(
            r#"{
                "initial_copy": false,
                "bindings": [{ "source": "/in", "destination": "/out", "settle_delay_secs": 3 }]
            }"#,
        )
        .unwrap();

        assert!(!config.initial_copy);
        assert_eq!(config.bindings[0].settle_delay_secs, 3);
        assert_eq!(config.bindings[0].quiet_window_secs, 2);
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("mirror.json");
        fs::write(&json_path, r#"{ "event_buffer": 16 }"#).unwrap();
        let toml_path = dir.path().join("mirror.toml");
        fs::write(&toml_path, "event_buffer = 32\n").unwrap();

        assert_eq!(MirrorConfig::load(&json_path).unwrap().event_buffer, 16);
        assert_eq!(MirrorConfig::load(&toml_path).unwrap().event_buffer, 32);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = MirrorConfig::from_toml_str("max_tracked_paths = 0\n").unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_normalize_path_arg() {
        assert_eq!(normalize_path_arg(" /src/dir, "), PathBuf::from("/src/dir"));
        assert_eq!(normalize_path_arg("/out,,"), PathBuf::from("/out"));
        assert_eq!(normalize_path_arg("/plain"), PathBuf::from("/plain"));
    }

    #[test]
    fn test_resolve_creates_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src");
        fs::create_dir(&source).unwrap();
        let destination = dir.path().join("out/nested");

        let binding = BindingConfig::new(&source, &destination)
            .with_settle_delay_secs(4)
            .resolve()
            .unwrap();

        assert!(destination.is_dir());
        assert!(binding.source_root().is_absolute());
        assert_eq!(binding.settle_delay(), Duration::from_secs(4));
        assert_eq!(binding.quiet_window(), Duration::from_secs(2));
    }

    #[test]
    fn test_resolve_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = BindingConfig::new(dir.path().join("missing"), dir.path().join("out"))
            .resolve()
            .unwrap_err();

        assert!(matches!(err, MirrorError::SourceNotFound(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_resolve_rejects_destination_inside_source() {
        let dir = TempDir::new().unwrap();
        let err = BindingConfig::new(dir.path(), dir.path().join("mirror"))
            .resolve()
            .unwrap_err();

        assert!(matches!(err, MirrorError::Config(_)));
    }
}
