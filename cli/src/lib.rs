//! Command-line front end: resolves the configured directory pairs, starts
//! the mirror service and runs until interrupted.

pub mod args;
pub mod logging;

use anyhow::{Context, bail};
use dirmirror_core::MirrorService;
use tracing::info;

pub use args::Cli;

/// Mirror every configured pair until Ctrl-C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;

    let mut service = MirrorService::new(config.service_options());
    let added = service.add_all(&config.bindings).await;
    if added == 0 {
        bail!(
            "none of the {} configured directory pair(s) can be mirrored",
            config.bindings.len()
        );
    }

    service.start().await.context("failed to start mirroring")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for interrupt signal")?;

    info!("Stopping watcher...");
    service.stop().await;
    Ok(())
}
