// error.rs — Client-side error taxonomy.
//
// Auth faults and connectivity faults are kept apart so a UI can send the
// user to sign-in for one and offer a retry for the other.

use coach_lifecycle::LifecycleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered 401 or 403.
    #[error("authentication required (HTTP {status})")]
    AuthenticationRequired { status: u16 },

    /// Network failure, any other non-2xx answer, or an unreadable body.
    #[error("connectivity fault: {0}")]
    Connectivity(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("catalog is read-only for this account")]
    ReadOnlyCatalog,

    #[error("no program is being authored")]
    NoProgramInProgress,
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::AuthenticationRequired { .. })
    }
}
