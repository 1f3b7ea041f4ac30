//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use archive_harvester::HarvestConfig;
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Batch download language-filtered PDFs from the Internet Archive.
///
/// Searches the archive, keeps items in the configured languages, downloads
/// their PDF files and records each download so later runs skip it.
#[derive(Parser, Debug)]
#[command(name = "archive-harvester")]
#[command(author, version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (TOML); defaults to ./harvester.toml when present
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Options for the default `run` command
    #[command(flatten)]
    pub run: RunArgs,
}

impl Args {
    /// The subcommand to execute; `run` when none was given.
    #[must_use]
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(self.run.clone()))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search, filter and download (default)
    Run(RunArgs),

    /// Summarize the record store, download directory and log file
    Progress(PathArgs),

    /// Smoke-test the live archive APIs and the record store in a scratch directory
    SelfTest,
}

/// Local paths shared by `run` and `progress`.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct PathArgs {
    /// Directory receiving downloaded PDFs
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// SQLite database recording downloads
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}

impl PathArgs {
    /// Applies the given paths over `config`.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(dir) = &self.download_dir {
            config.download_dir.clone_from(dir);
        }
        if let Some(database) = &self.database {
            config.database_path.clone_from(database);
        }
    }
}

/// Options of the `run` command.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Search query
    #[arg(long)]
    pub query: Option<String>,

    /// Maximum search pages to fetch
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// Results per search page (1-10000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub rows: Option<u32>,

    #[command(flatten)]
    pub paths: PathArgs,
}

impl RunArgs {
    /// Applies the given options over `config`.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(query) = &self.query {
            config.query.clone_from(query);
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(rows) = self.rows {
            config.rows_per_page = rows;
        }
        self.paths.apply(config);
    }
}
