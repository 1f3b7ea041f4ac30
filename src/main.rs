//! CLI entry point for the archive harvester.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use archive_harvester::HarvestConfig;
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod logging;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let command = args.resolved_command();

    let mut config = HarvestConfig::load_or_default(args.config.as_deref())
        .context("failed to load configuration")?;
    match &command {
        Command::Run(run) => run.apply(&mut config),
        Command::Progress(paths) => paths.apply(&mut config),
        Command::SelfTest => {}
    }
    config.validate().context("invalid configuration")?;

    // The progress command reads the log file, so it must not write to it.
    let log_file = match command {
        Command::Progress(_) => None,
        Command::Run(_) | Command::SelfTest => Some(config.log_file.as_path()),
    };
    let level = logging::default_level(args.quiet, args.verbose, &config.log_level);
    let _log_guard = logging::init(level, log_file)?;
    debug!(?args, "CLI arguments parsed");

    match command {
        Command::Run(_) => {
            let show_bar = io::stderr().is_terminal() && !args.quiet;
            commands::run_harvest_command(config, show_bar).await
        }
        Command::Progress(_) => commands::run_progress_command(&config).await,
        Command::SelfTest => commands::run_self_test_command(&config).await,
    }
}
