//! # nisinp entry point
//!
//! Parses command-line arguments, initialises tracing and dispatches to
//! the subcommand handlers in the library half of this crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nisinp_cli::catalog::{run_catalog, CatalogArgs};
use nisinp_cli::serve::{run_serve, ServeArgs};
use nisinp_cli::sweep::{run_sweep, SweepArgs};

/// NIS incident notification engine.
///
/// Runs the deadline reconciliation, reminder and retention sweeps over
/// the incident store and notifies operators of every change.
#[derive(Parser, Debug)]
#[command(name = "nisinp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sweep scheduler with health and metrics endpoints.
    Serve(ServeArgs),

    /// Run sweeps once and exit.
    Sweep(SweepArgs),

    /// Catalog inspection.
    Catalog(CatalogArgs),
}

/// `RUST_LOG` wins; otherwise the `-v` count picks the level.
fn env_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("nisinp {} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Sweep(args) => run_sweep(args).await,
        Commands::Catalog(args) => run_catalog(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
