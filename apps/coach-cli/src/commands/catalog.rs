// catalog.rs — Catalog subcommands: list.

use clap::{Subcommand, ValueEnum};
use coach_lifecycle::{CatalogEntry, CatalogKind};
use coach_policy::Collection;
use coach_sync::store::read_collection;
use coach_sync::JsonFileOptionStore;

use crate::DataPaths;

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Exercise,
    Food,
}

impl From<KindArg> for CatalogKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Exercise => CatalogKind::Exercise,
            KindArg::Food => CatalogKind::Food,
        }
    }
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List catalog entries of one kind, optionally filtered by name.
    List {
        #[arg(long, value_enum, default_value = "exercise")]
        kind: KindArg,
        /// Substring to match against entry names.
        #[arg(long, default_value = "")]
        search: String,
    },
}

pub fn execute(cmd: &CatalogCommands, paths: &DataPaths) -> anyhow::Result<()> {
    let store = JsonFileOptionStore::new(&paths.options)?;
    let entries: Vec<CatalogEntry> = read_collection(&store, Collection::Exercises)?;

    match cmd {
        CatalogCommands::List { kind, search } => {
            let found = CatalogEntry::search(&entries, (*kind).into(), search);
            if found.is_empty() {
                println!("No catalog entries.");
                return Ok(());
            }
            println!("{:<12} {:<30} {:<16} VIDEO", "ID", "NAME", "CATEGORY");
            println!("{}", "-".repeat(72));
            for entry in found {
                println!(
                    "{:<12} {:<30} {:<16} {}",
                    entry.id,
                    entry.name,
                    entry.category,
                    entry.video_url.as_deref().unwrap_or("-"),
                );
            }
        }
    }

    Ok(())
}
