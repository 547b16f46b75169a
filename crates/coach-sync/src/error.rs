// error.rs — Error types for the sync engine and option stores.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// An option blob exists but its records do not decode.
    #[error("option '{key}' holds malformed records: {source}")]
    Store {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] coach_audit::AuditError),
}
