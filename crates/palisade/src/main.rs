//! Palisade - OAuth authentication gateway
//!
//! Main entry point for the Palisade CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{check, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Palisade - OAuth authentication gateway
#[derive(Parser)]
#[command(name = "palisade")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rolling JSON logs
    #[arg(long, global = true, env = "PALISADE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every configured profile
    Serve(serve::ServeArgs),

    /// Validate the configuration and print a summary
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(|| {
        palisade_config::xdg_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    });
    let _guard = init_tracing(cli.verbose, &log_dir);

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}

/// Console (human-readable) + rotating JSON file. The returned guard flushes
/// the file writer on drop.
fn init_tracing(verbose: bool, log_dir: &Path) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "palisade=debug,palisade_server=debug,palisade_oauth=debug,palisade_config=debug,tower_http=debug,info"
    } else {
        "palisade=info,palisade_server=info,palisade_oauth=info,palisade_config=info,warn"
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("palisade.log")
        .build(log_dir);

    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "palisade=trace,palisade_server=trace,palisade_oauth=trace,palisade_config=trace,tower_http=debug,info",
                ));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "warning: file logging disabled ({}): {}",
                log_dir.display(),
                e
            );
            (None, None)
        }
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
