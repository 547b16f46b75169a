//! # coach
//!
//! Operator CLI for a coaching data directory.
//!
//! - `coach request list/show/counts` — inspect engagement requests
//! - `coach catalog list` — browse the movement/food catalog
//! - `coach audit verify/tail/rejected` — inspect the sync audit trail
//!
//! Reads the same files the daemon writes; never modifies them.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Coaching data CLI.
#[derive(Parser)]
#[command(name = "coach", version, about)]
struct Cli {
    /// Data directory (the daemon's `.coach` directory).
    #[arg(long, default_value = ".coach")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect engagement requests.
    Request {
        #[command(subcommand)]
        command: commands::request::RequestCommands,
    },
    /// Browse the catalog.
    Catalog {
        #[command(subcommand)]
        command: commands::catalog::CatalogCommands,
    },
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

/// File locations inside a data directory, matching the daemon defaults.
pub struct DataPaths {
    pub options: PathBuf,
    pub audit_log: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            options: data_dir.join("options"),
            audit_log: data_dir.join("audit.jsonl"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = DataPaths::new(&cli.data_dir);

    match &cli.command {
        Commands::Request { command } => commands::request::execute(command, &paths),
        Commands::Catalog { command } => commands::catalog::execute(command, &paths),
        Commands::Audit { command } => commands::audit::execute(command, &paths),
    }
}
