//! # coach-sync
//!
//! Snapshot-merge synchronization for the shared coaching collections.
//!
//! Clients push their entire local copy of a collection. The server merges
//! each pushed collection into the option store according to the caller's
//! [`coach_policy::AuthorizationScope`]:
//!
//! - the authority's snapshot replaces the persisted collection;
//! - a subject's snapshot is merged record by record: only records the
//!   subject owns are considered, and only the fields
//!   [`coach_policy::SubjectWritable`] leaves to the subject are taken;
//! - the catalog is written by the authority only.
//!
//! Dropped records are reported in a [`MergeReport`] and recorded in the
//! audit log, never raised as errors.

pub mod error;
pub mod merge;
pub mod service;
pub mod store;
pub mod wire;

pub use error::SyncError;
pub use merge::{merge_catalog, merge_owned, DroppedRecord, MergeMode, MergeReport};
pub use service::{PushSummary, SyncService};
pub use store::{
    read_collection, write_collection, JsonFileOptionStore, MemoryOptionStore, OptionStore,
};
pub use wire::{CurrentUser, DataView, PushBody, PushResponse};
