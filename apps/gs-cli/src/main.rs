//! # gsb
//!
//! Command-line front end for the goal score batch.
//!
//! - `gsb run`: score every active member now, ignoring the calendar
//! - `gsb tick`: one scheduled tick (runs only on the last day of the month)
//! - `gsb daemon`: tick daily at the configured time until Ctrl-C
//! - `gsb config`: print the effective configuration

mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};

/// Goal score batch: recompute goal scores for active members.
#[derive(Parser)]
#[command(name = "gsb", version, about)]
struct Cli {
    /// Config file (defaults to ./gsb.toml; missing means all defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the batch now and wait for it to finish.
    Run,
    /// Fire one scheduled tick for a given day.
    Tick {
        /// Day to evaluate the last-day gate against (defaults to today).
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Tick every day at the configured local time.
    Daemon {
        /// Also start a manual run immediately.
        #[arg(long)]
        run_now: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_format)?;
    logging::install_panic_hook();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load_or_default(&config_path)?;

    match &cli.command {
        Commands::Run => commands::run::execute(&config),
        Commands::Tick { date } => commands::tick::execute(&config, *date),
        Commands::Daemon { run_now } => commands::daemon::execute(&config, *run_now),
        Commands::Config => commands::show_config::execute(&config),
    }
}
