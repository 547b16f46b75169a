// error.rs — Error types for the request lifecycle and program builder.

use thiserror::Error;

use crate::request::RequestStatus;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested transition is not an edge of the lifecycle graph.
    #[error("invalid transition from {from} to {to} for request {request_id}")]
    InvalidTransition {
        request_id: String,
        from: RequestStatus,
        to: RequestStatus,
    },

    /// The action exists but belongs to the other role.
    #[error("{actor} may not {action} request {request_id}")]
    ActorNotAllowed {
        request_id: String,
        actor: String,
        action: String,
    },

    /// A subject tried to act on a request it does not own.
    #[error("request {request_id} is not owned by {identity}")]
    NotOwner {
        request_id: String,
        identity: String,
    },

    #[error("price must be greater than zero")]
    InvalidPrice,

    #[error("receipt reference must not be empty")]
    EmptyReceipt,

    #[error("message text must not be empty")]
    EmptyMessage,

    #[error("progress weight must be positive, got {0}")]
    InvalidWeight(f64),

    /// A biometric profile carries more photo references than allowed.
    #[error("at most {max} photos allowed, got {count}")]
    TooManyPhotos { count: usize, max: usize },

    #[error("training day not found: {0}")]
    DayNotFound(String),

    #[error("section {index} not found on day {day_id}")]
    SectionNotFound { day_id: String, index: usize },

    #[error("training row not found: {0}")]
    RowNotFound(String),

    #[error("nutrition entry not found: {0}")]
    NutritionEntryNotFound(String),

    /// Publishing requires at least one training day.
    #[error("cannot publish a program with no training days")]
    EmptyProgram,

    /// The builder was started for a different request than the one being published.
    #[error("builder belongs to request {expected}, got {actual}")]
    RequestMismatch { expected: String, actual: String },

    #[error("program end date out of range")]
    DateOutOfRange,

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
