use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use granary::cli::{Cli, Command};
use granary::{app, logging};
use tracing::{error, info};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mode = match &cli.command {
        Command::Query(_) => "query",
        Command::Download(_) => "download",
        Command::Ledger(_) => "ledger",
    };
    info!(mode, dry_run = cli.dry_run, smoke_run = cli.smoke_run, "starting");
    app::execute(cli).await.with_context(|| format!("{mode} run aborted"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
