//! # coach-audit
//!
//! Append-only audit log for the snapshot-merge sync engine.
//!
//! Every push that reaches the server leaves a trail: wholesale collection
//! replacements by the authority, per-record merges by subjects, and, most
//! importantly, every record a subject tried to write but was not allowed
//! to own. Those drops are silent on the wire, so the audit log is where
//! they become countable.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use coach_audit::{AuditAction, AuditEvent, AuditLog};
//!
//! let mut log = AuditLog::open("/tmp/coach-audit.jsonl").unwrap();
//! let mut event = AuditEvent::new("S42", AuditAction::WriteRejected)
//!     .with_collection("requests")
//!     .with_record("req-7");
//! log.append(&mut event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;

pub use error::AuditError;
pub use event::{AuditAction, AuditEvent};
pub use log::AuditLog;
