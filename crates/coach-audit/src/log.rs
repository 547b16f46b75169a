// log.rs — Append-only JSONL audit log.
//
// One JSON object per line. Each event links to the previous line via
// `previous_hash`, so inserting, deleting, or editing a line breaks the
// chain and `verify_chain` reports where.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::event::{AuditAction, AuditEvent};
use crate::hasher;

/// An append-only audit log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Hash of the last line written; becomes `previous_hash` of the next event.
    last_hash: Option<String>,
}

impl AuditLog {
    /// Open (or create) an audit log at the given path.
    ///
    /// An existing log is scanned for its last line so new events continue
    /// the chain.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Append an event, chaining it to the previous one. Flushes after writing.
    pub fn append(&mut self, event: &mut AuditEvent) -> Result<(), AuditError> {
        event.previous_hash = self.last_hash.clone();

        let json = serde_json::to_string(event)?;
        self.last_hash = Some(hasher::hash_str(&json));

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;

        tracing::debug!(
            action = ?event.action,
            actor = %event.actor_id,
            "audit event appended"
        );
        Ok(())
    }

    /// Read all events from a log file, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Count events of a given action, e.g. how many writes were rejected.
    pub fn count_action(
        path: impl AsRef<Path>,
        action: &AuditAction,
    ) -> Result<usize, AuditError> {
        Ok(Self::read_all(path)?
            .iter()
            .filter(|e| &e.action == action)
            .count())
    }

    /// Verify the hash chain of a log file.
    ///
    /// Returns `Ok(true)` when intact, `IntegrityViolation` at the first
    /// broken link otherwise.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut previous_hash: Option<String> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event: AuditEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut last_line: Option<String> = None;

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }

        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_and_read_back_in_order() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            let mut e1 = AuditEvent::new("ADMIN", AuditAction::CollectionReplaced)
                .with_collection("requests");
            let mut e2 = AuditEvent::new("S1", AuditAction::WriteRejected)
                .with_collection("requests")
                .with_record("req-2");
            log.append(&mut e1).unwrap();
            log.append(&mut e2).unwrap();
        }

        let events = AuditLog::read_all(&log_path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::CollectionReplaced);
        assert!(events[0].previous_hash.is_none());
        assert_eq!(events[1].record_id.as_deref(), Some("req-2"));
        assert!(events[1].previous_hash.is_some());
    }

    #[test]
    fn reopen_continues_chain() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.jsonl");

        for actor in ["S1", "S2"] {
            let mut log = AuditLog::open(&log_path).unwrap();
            let mut event = AuditEvent::new(actor, AuditAction::CollectionMerged);
            log.append(&mut event).unwrap();
        }

        assert!(AuditLog::verify_chain(&log_path).unwrap());
        assert_eq!(AuditLog::read_all(&log_path).unwrap().len(), 2);
    }

    #[test]
    fn tampered_line_breaks_chain() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            for _ in 0..3 {
                let mut event = AuditEvent::new("S1", AuditAction::WriteRejected);
                log.append(&mut event).unwrap();
            }
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.remove(1);
        std::fs::write(&log_path, lines.join("\n")).unwrap();

        let result = AuditLog::verify_chain(&log_path);
        assert!(matches!(
            result,
            Err(AuditError::IntegrityViolation { line: 2, .. })
        ));
    }

    #[test]
    fn count_action_counts_rejections() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            let mut merged = AuditEvent::new("S1", AuditAction::CollectionMerged);
            log.append(&mut merged).unwrap();
            for id in ["a", "b"] {
                let mut dropped = AuditEvent::new("S1", AuditAction::WriteRejected).with_record(id);
                log.append(&mut dropped).unwrap();
            }
        }

        assert_eq!(
            AuditLog::count_action(&log_path, &AuditAction::WriteRejected).unwrap(),
            2
        );
    }
}
