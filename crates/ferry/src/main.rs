//! ferry - inspect the resolved runtime configuration.
//!
//! Main entry point for the ferry CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{credentials, path, show, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// ferry - layered runtime configuration for LLM agents
#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to load instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the LLM provider
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Override the LLM model
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved configuration and where each value came from
    Show,

    /// Show only values that did not come from defaults
    Sources,

    /// List credentials discovered from local LLM CLIs
    Credentials,

    /// Show the config file path
    Path,

    /// Watch the config file and reload on change
    Watch(watch::WatchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Console logs go to stderr so stdout stays parseable; a daily JSON log is
/// kept under `~/.ferry/logs` when that directory is writable.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "ferry=debug,ferry_config=debug,ferry_oauth=debug,info"
    } else {
        "ferry=info,ferry_config=warn,ferry_oauth=warn,warn"
    };

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".ferry").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ferry")
        .filename_suffix("log")
        .build(&log_dir)
        .ok();
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "ferry=trace,ferry_config=trace,ferry_oauth=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_path: cli.config,
        provider: cli.provider,
        model: cli.model,
    };

    match cli.command {
        Commands::Show => show::run(&ctx, false).await,
        Commands::Sources => show::run(&ctx, true).await,
        Commands::Credentials => credentials::run(&ctx).await,
        Commands::Path => path::run(&ctx),
        Commands::Watch(args) => watch::run(args, &ctx).await,
    }
}
