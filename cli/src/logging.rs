use std::ffi::OsStr;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install console and file logging.
///
/// The level comes from `RUST_LOG`, defaulting to `info`. Keep the returned
/// guard alive until exit so buffered file output is flushed.
pub fn init(log_file: &Path) -> anyhow::Result<WorkerGuard> {
    let (file_writer, guard) = file_writer(log_file)?;

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// Non-blocking appender for `log_file`. The file is appended to, never rotated.
pub fn file_writer(log_file: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .unwrap_or(OsStr::new("dirmirror.log"))
        .to_string_lossy()
        .into_owned();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)?;
    Ok(tracing_appender::non_blocking(appender))
}
