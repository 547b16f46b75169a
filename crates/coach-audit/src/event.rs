// event.rs — Audit event data model.
//
// One event per sync decision. Events form a chain: each one carries the
// hash of the line before it, so the log can be checked for tampering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of sync decision this event records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The authority's snapshot replaced a persisted collection wholesale.
    CollectionReplaced,
    /// A subject's snapshot was merged into a collection record by record.
    CollectionMerged,
    /// A subject tried to write a record it does not own; the record was dropped.
    WriteRejected,
    /// A subject pushed the catalog; the push was ignored.
    CatalogWriteIgnored,
}

/// A single audit event — one line in the JSONL audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,

    pub timestamp: DateTime<Utc>,

    /// Identity of the caller whose push produced this event.
    pub actor_id: String,

    pub action: AuditAction,

    /// Collection key the push targeted (`requests`, `programs`, `exercises`).
    pub collection: Option<String>,

    /// Record id, for per-record events such as `WriteRejected`.
    pub record_id: Option<String>,

    /// Hash of the previous line in the log. `None` for the first event.
    pub previous_hash: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    /// Create a new event stamped with the current time and a fresh id.
    pub fn new(actor_id: impl Into<String>, action: AuditAction) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id: actor_id.into(),
            action,
            collection: None,
            record_id: None,
            previous_hash: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
