//! # coach-policy
//!
//! Authorization scoping for the coaching sync engine.
//!
//! Every caller resolves to a [`Role`] (authority or subject) plus a stable
//! identity token. [`AuthorizationScope`] then answers two questions for a
//! shared collection:
//!
//! - **read**: the authority sees every record, a subject sees only records
//!   whose ownership field equals its identity;
//! - **write**: the authority's snapshot is trusted wholesale, a subject may
//!   only write records it owns and only the fields [`SubjectWritable`]
//!   leaves to it, and nobody but the authority writes the catalog.
//!
//! ## Key components
//!
//! - [`Caller`] — resolved role + identity of an authenticated session
//! - [`OwnedRecord`] — trait implemented by every ownable record type
//! - [`AuthorizationScope`] — read filtering and per-record [`WriteDecision`]s

pub mod error;
pub mod role;
pub mod scope;

pub use error::PolicyError;
pub use role::{Caller, Role};
pub use scope::{
    AuthorizationScope, Collection, DropReason, OwnedRecord, SubjectWritable, WriteDecision,
};
