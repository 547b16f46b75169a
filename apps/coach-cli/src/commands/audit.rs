// audit.rs — Audit subcommands: verify, tail, rejected.

use std::path::PathBuf;

use clap::Subcommand;
use coach_audit::{AuditAction, AuditError, AuditLog};

use crate::DataPaths;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain integrity.
    Verify {
        /// Path to audit log (defaults to <data-dir>/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent audit events.
    Tail {
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// List records dropped from subject pushes.
    Rejected {
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

pub fn execute(cmd: &AuditCommands, paths: &DataPaths) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| paths.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match AuditLog::verify_chain(&path) {
                Ok(_) => {
                    let events = AuditLog::read_all(&path)?;
                    println!(
                        "Audit log verified: {} event(s), hash chain intact.",
                        events.len()
                    );
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let path = log.clone().unwrap_or_else(|| paths.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let events = AuditLog::read_all(&path)?;
            let start = events.len().saturating_sub(*n);
            let recent = &events[start..];
            if recent.is_empty() {
                println!("No audit events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<10} {:<22} {:<10} RECORD",
                "TIMESTAMP", "ACTOR", "ACTION", "COLLECTION"
            );
            println!("{}", "-".repeat(80));
            for event in recent {
                println!(
                    "{:<20} {:<10} {:<22} {:<10} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.actor_id,
                    action_name(&event.action),
                    event.collection.as_deref().unwrap_or("-"),
                    event.record_id.as_deref().unwrap_or("-"),
                );
            }
        }

        AuditCommands::Rejected { log } => {
            let path = log.clone().unwrap_or_else(|| paths.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let rejected: Vec<_> = AuditLog::read_all(&path)?
                .into_iter()
                .filter(|e| e.action == AuditAction::WriteRejected)
                .collect();
            println!("{} record(s) dropped from subject pushes.", rejected.len());
            for event in &rejected {
                println!(
                    "  {} {} {}/{} ({})",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.actor_id,
                    event.collection.as_deref().unwrap_or("-"),
                    event.record_id.as_deref().unwrap_or("-"),
                    event.metadata["reason"].as_str().unwrap_or("unknown"),
                );
            }
        }
    }

    Ok(())
}

fn action_name(action: &AuditAction) -> &'static str {
    match action {
        AuditAction::CollectionReplaced => "collection_replaced",
        AuditAction::CollectionMerged => "collection_merged",
        AuditAction::WriteRejected => "write_rejected",
        AuditAction::CatalogWriteIgnored => "catalog_write_ignored",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_audit::AuditEvent;
    use tempfile::tempdir;

    #[test]
    fn commands_tolerate_missing_log() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        execute(&AuditCommands::Verify { log: None }, &paths).unwrap();
        execute(&AuditCommands::Tail { log: None, n: 5 }, &paths).unwrap();
        execute(&AuditCommands::Rejected { log: None }, &paths).unwrap();
    }

    #[test]
    fn verify_passes_on_intact_log() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let mut log = AuditLog::open(&paths.audit_log).unwrap();
        let mut event = AuditEvent::new("S1", AuditAction::WriteRejected)
            .with_collection("requests")
            .with_record("r1");
        log.append(&mut event).unwrap();

        execute(&AuditCommands::Verify { log: None }, &paths).unwrap();
        execute(&AuditCommands::Rejected { log: None }, &paths).unwrap();
    }
}
