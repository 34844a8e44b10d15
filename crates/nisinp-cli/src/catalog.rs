//! # Catalog CLI
//!
//! `nisinp catalog validate --config nisinp.yaml` loads the configuration,
//! runs every catalog cross-check and prints the step graphs it found.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use nisinp_engine::Catalog;

use crate::config;

/// Catalog subcommand arguments.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Available catalog subcommands.
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Load and cross-check the catalog, then list its step graphs.
    Validate {
        /// Configuration file.
        #[arg(long, short)]
        config: PathBuf,
    },
}

/// Execute the catalog subcommand.
pub fn run_catalog(args: &CatalogArgs) -> Result<u8> {
    match &args.command {
        CatalogCommand::Validate { config: path } => {
            let app = config::load(path)
                .with_context(|| format!("catalog in {} is invalid", path.display()))?;
            print!("{}", describe(&app.catalog));
            println!("OK: {} step graphs", app.catalog.graphs.len());
            Ok(0)
        }
    }
}

/// One line per graph followed by one line per step.
pub fn describe(catalog: &Catalog) -> String {
    let mut out = String::new();
    for graph in catalog.graphs.iter() {
        let _ = writeln!(
            out,
            "{} ({} / {} / {}){}",
            graph.id.as_str(),
            graph.regulation.as_str(),
            graph.regulator.as_str(),
            graph.sector.as_str(),
            if graph.detection_date_required {
                ", detection date required"
            } else {
                ""
            }
        );
        for step in graph.steps() {
            let _ = writeln!(
                out,
                "  {}. {} [{}] {} +{}h, {} reminders",
                step.position,
                step.name,
                step.report.as_str(),
                step.trigger,
                step.delay_hours,
                step.reminders.len()
            );
        }
    }
    out
}
