use clap::Parser;
use dirmirror_cli::{Cli, logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = cli.validate() {
        e.exit();
    }

    let _log_guard = logging::init(&cli.log_file)?;
    run(cli).await
}
