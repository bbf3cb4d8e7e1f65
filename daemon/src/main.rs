use anyhow::Context;
use clap::Parser;
use marca_daemon::signal::shutdown_signal;
use marca_daemon::{Cli, ProcessSupervisor};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let context = cli
        .into_run_context()
        .context("failed to build configuration")?;

    // Armed before startup so a signal during the scan is not lost.
    let shutdown = shutdown_signal().context("failed to install signal handlers")?;

    let summary = ProcessSupervisor::new(context)
        .run(shutdown)
        .await
        .context("marca stopped with an error")?;

    info!(
        "Processed {} files ({} failed, {} abandoned)",
        summary.stats.succeeded, summary.stats.failed, summary.stats.abandoned
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
