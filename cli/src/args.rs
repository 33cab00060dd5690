//! Command-line arguments and config discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use dirmirror_core::config::DEFAULT_QUIET_WINDOW_SECS;
use dirmirror_core::{BindingConfig, MirrorConfig};

/// Default config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "dirmirror.toml";

/// Mirror directory trees as they change.
#[derive(Debug, Parser)]
#[command(name = "dirmirror", author, version, about, long_about = None)]
pub struct Cli {
    /// Directory pairs to mirror: SOURCE DEST [SOURCE DEST ...]
    #[arg(value_name = "SOURCE DEST")]
    pub paths: Vec<String>,

    /// Config file with [[bindings]] entries (.toml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds to wait before verifying a modified file (positional pairs)
    #[arg(long, default_value_t = 0)]
    pub settle_delay: u64,

    /// Seconds during which repeated events for one path are dropped (positional pairs)
    #[arg(long, default_value_t = DEFAULT_QUIET_WINDOW_SECS)]
    pub quiet_window: u64,

    /// Skip the baseline copy of existing files
    #[arg(long)]
    pub no_initial_copy: bool,

    /// Maximum number of paths remembered per pair for debouncing
    #[arg(long)]
    pub max_tracked_paths: Option<usize>,

    /// Notification queue capacity per pair
    #[arg(long)]
    pub event_buffer: Option<usize>,

    /// Log file, written alongside console output
    #[arg(long, default_value = "dirmirror.log")]
    pub log_file: PathBuf,
}

impl Cli {
    /// Reject argument combinations clap cannot express.
    pub fn validate(&self) -> Result<(), clap::Error> {
        if self.paths.len() % 2 != 0 {
            return Err(Cli::command().error(
                ErrorKind::WrongNumberOfValues,
                "directories must be given in SOURCE DEST pairs",
            ));
        }
        Ok(())
    }

    /// Directory pairs given on the command line.
    pub fn pairs(&self) -> Vec<BindingConfig> {
        self.paths
            .chunks_exact(2)
            .map(|pair| {
                BindingConfig::from_args(&pair[0], &pair[1])
                    .with_settle_delay_secs(self.settle_delay)
                    .with_quiet_window_secs(self.quiet_window)
            })
            .collect()
    }

    /// Build the effective configuration.
    ///
    /// An explicit `--config` is always loaded and positional pairs are
    /// appended to it. Without positional pairs the config file is looked up
    /// in the working directory, then in the user config directory.
    pub fn resolve_config(&self) -> anyhow::Result<MirrorConfig> {
        let mut config = match (&self.config, self.paths.is_empty()) {
            (Some(path), _) => load(path)?,
            (None, false) => MirrorConfig::new(),
            (None, true) => match discover_config() {
                Some(path) => load(&path)?,
                None => bail!(
                    "no directory pairs given; pass SOURCE DEST pairs or create {LOCAL_CONFIG_FILE}"
                ),
            },
        };

        config.bindings.extend(self.pairs());
        if self.no_initial_copy {
            config.initial_copy = false;
        }
        if let Some(max) = self.max_tracked_paths {
            config.max_tracked_paths = max;
        }
        if let Some(buffer) = self.event_buffer {
            config.event_buffer = buffer;
        }
        config.validate()?;

        if config.bindings.is_empty() {
            bail!("no directory pairs configured");
        }
        Ok(config)
    }
}

fn load(path: &Path) -> anyhow::Result<MirrorConfig> {
    MirrorConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("dirmirror").join("config.toml"))
        .filter(|path| path.is_file())
}
