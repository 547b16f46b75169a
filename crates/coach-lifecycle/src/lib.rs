//! # coach-lifecycle
//!
//! The engagement request state machine and the program data model.
//!
//! An [`EngagementRequest`] moves one way through its lifecycle:
//!
//! ```text
//! PENDING → APPROVED_WAITING_PAYMENT → PAYMENT_UPLOADED → PAYMENT_APPROVED
//!         → WAITING_FOR_PLAN → PLAN_READY
//! PENDING → REJECTED
//! PAYMENT_UPLOADED → APPROVED_WAITING_PAYMENT   (receipt rejected)
//! ```
//!
//! Every transition is a pure function: it takes the current record and the
//! acting [`coach_policy::Caller`] and returns a new record or a
//! [`LifecycleError`]. Nothing here touches storage.
//!
//! ## Key components
//!
//! - [`RequestStatus`] / [`RequestAction`] — legal states and the actions that move between them
//! - [`EngagementRequest`] — the workflow record plus its append-only message and progress logs
//! - [`ProgramBuilder`] — authoring model for the deliverable, published atomically
//! - [`CoachEvent`] / [`EventDispatcher`] — lifecycle events for notification sinks

pub mod builder;
pub mod catalog;
pub mod error;
pub mod events;
pub mod profile;
pub mod program;
pub mod request;
pub mod subject_write;

pub use builder::{ProgramBuilder, Publication};
pub use catalog::{CatalogEntry, CatalogKind};
pub use error::LifecycleError;
pub use events::{lifecycle_events, CoachEvent, EventDispatcher, LogSink, NotificationSink};
pub use profile::{BiometricProfile, Measurements, Message, ProgressSample, MAX_PHOTOS};
pub use program::{NutritionEntry, Program, SectionType, TrainingDay, TrainingRow, TrainingSection};
pub use request::{
    DurationClass, EngagementRequest, PaymentAccount, RequestAction, RequestDetails,
    RequestStatus, StatusCounts,
};
