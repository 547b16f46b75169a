// scope.rs — Read filtering and per-record write decisions.
//
// The rules, per shared collection:
//
//   read   authority → every record
//          subject   → records whose ownership field == identity
//   write  authority → incoming snapshot replaces the collection
//          subject   → per record: accepted only if the incoming record is
//                      owned by the subject AND it does not overwrite a
//                      persisted record owned by someone else AND the record
//                      type's SubjectWritable rules accept the field changes
//   catalog          → read-open, authority-only write
//
// A rejected subject write is a drop, not an error. The caller is expected
// to surface drops through logging/audit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::role::{Caller, Role};

/// The independently-keyed shared collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Requests,
    Programs,
    Exercises,
}

impl Collection {
    /// Option-store key for this collection.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Requests => "requests",
            Collection::Programs => "programs",
            Collection::Exercises => "exercises",
        }
    }

    /// Whether records in this collection are owned per subject.
    /// The catalog is shared and owned by no subject.
    pub fn is_owned(&self) -> bool {
        !matches!(self, Collection::Exercises)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A record that belongs to exactly one subject.
pub trait OwnedRecord {
    /// Opaque unique id used as the merge key.
    fn record_id(&self) -> &str;

    /// Identity of the subject that owns this record.
    fn owner_id(&self) -> &str;
}

/// Field-level rules for a subject writing records it owns.
///
/// Owning a record does not make every field writable: price, status and
/// similar fields belong to the authority even on the subject's own record.
pub trait SubjectWritable: OwnedRecord + Sized {
    /// Check a record that has no persisted counterpart yet.
    fn check_subject_create(&self) -> Result<(), String>;

    /// Fold the subject-writable parts of `incoming` onto `self`, the
    /// persisted record. Every other field is taken from `self`.
    fn apply_subject_write(&self, incoming: Self) -> Result<Self, String>;
}

/// Why a subject write was dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// The incoming record names another subject as owner.
    NotOwner { claimed_owner: String },
    /// The incoming record claims the caller as owner, but the persisted
    /// record with the same id belongs to someone else.
    ForeignRecord { persisted_owner: String },
    /// The record is the subject's, but the write touches fields or
    /// transitions only the authority may make.
    IllegalChange { detail: String },
    /// Only the authority writes the catalog.
    CatalogReadOnly,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NotOwner { claimed_owner } => {
                write!(f, "record owned by {}", claimed_owner)
            }
            DropReason::ForeignRecord { persisted_owner } => {
                write!(f, "persisted record owned by {}", persisted_owner)
            }
            DropReason::IllegalChange { detail } => write!(f, "illegal change: {}", detail),
            DropReason::CatalogReadOnly => write!(f, "catalog is authority-only"),
        }
    }
}

/// Outcome of checking one incoming record against the scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDecision {
    Accept,
    Drop(DropReason),
}

/// What one resolved caller may read and write.
#[derive(Debug, Clone)]
pub struct AuthorizationScope {
    caller: Caller,
}

impl AuthorizationScope {
    pub fn for_caller(caller: &Caller) -> Self {
        Self {
            caller: caller.clone(),
        }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn role(&self) -> Role {
        self.caller.role
    }

    pub fn can_read<R: OwnedRecord>(&self, record: &R) -> bool {
        match self.caller.role {
            Role::Authority => true,
            Role::Subject => record.owner_id() == self.caller.identity,
        }
    }

    /// Keep only the records this caller may read, preserving order.
    pub fn filter_readable<R: OwnedRecord>(&self, records: Vec<R>) -> Vec<R> {
        match self.caller.role {
            Role::Authority => records,
            Role::Subject => records.into_iter().filter(|r| self.can_read(r)).collect(),
        }
    }

    /// True when this caller's snapshot replaces a collection wholesale.
    pub fn replaces_wholesale(&self) -> bool {
        self.caller.role == Role::Authority
    }

    pub fn can_write_catalog(&self) -> bool {
        self.caller.role == Role::Authority
    }

    /// Decide whether one incoming record may be written.
    ///
    /// `persisted` is the currently stored record with the same id, if any.
    pub fn write_decision<R: OwnedRecord>(&self, incoming: &R, persisted: Option<&R>) -> WriteDecision {
        if self.caller.role == Role::Authority {
            return WriteDecision::Accept;
        }

        let identity = self.caller.identity.as_str();
        if incoming.owner_id() != identity {
            return WriteDecision::Drop(DropReason::NotOwner {
                claimed_owner: incoming.owner_id().to_string(),
            });
        }

        match persisted {
            Some(existing) if existing.owner_id() != identity => {
                WriteDecision::Drop(DropReason::ForeignRecord {
                    persisted_owner: existing.owner_id().to_string(),
                })
            }
            _ => WriteDecision::Accept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        id: &'static str,
        owner: &'static str,
    }

    impl OwnedRecord for Rec {
        fn record_id(&self) -> &str {
            self.id
        }
        fn owner_id(&self) -> &str {
            self.owner
        }
    }

    fn rec(id: &'static str, owner: &'static str) -> Rec {
        Rec { id, owner }
    }

    #[test]
    fn authority_reads_everything() {
        let scope = AuthorizationScope::for_caller(&Caller::authority("ADMIN"));
        let visible = scope.filter_readable(vec![rec("a", "S1"), rec("b", "S2")]);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn subject_reads_only_own_records() {
        let scope = AuthorizationScope::for_caller(&Caller::subject("S1"));
        let visible = scope.filter_readable(vec![rec("a", "S1"), rec("b", "S2"), rec("c", "S1")]);
        let ids: Vec<&str> = visible.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn subject_write_of_foreign_owner_is_dropped() {
        let scope = AuthorizationScope::for_caller(&Caller::subject("S1"));
        let decision = scope.write_decision(&rec("a", "S2"), None);
        assert_eq!(
            decision,
            WriteDecision::Drop(DropReason::NotOwner {
                claimed_owner: "S2".to_string()
            })
        );
    }

    #[test]
    fn subject_cannot_take_over_foreign_record_by_relabeling() {
        let scope = AuthorizationScope::for_caller(&Caller::subject("S1"));
        let persisted = rec("a", "S2");
        let decision = scope.write_decision(&rec("a", "S1"), Some(&persisted));
        assert!(matches!(
            decision,
            WriteDecision::Drop(DropReason::ForeignRecord { .. })
        ));
    }

    #[test]
    fn subject_write_of_own_record_is_accepted() {
        let scope = AuthorizationScope::for_caller(&Caller::subject("S1"));
        let persisted = rec("a", "S1");
        assert_eq!(
            scope.write_decision(&rec("a", "S1"), Some(&persisted)),
            WriteDecision::Accept
        );
        assert_eq!(scope.write_decision(&rec("new", "S1"), None), WriteDecision::Accept);
    }

    #[test]
    fn only_authority_writes_catalog() {
        assert!(AuthorizationScope::for_caller(&Caller::authority("ADMIN")).can_write_catalog());
        assert!(!AuthorizationScope::for_caller(&Caller::subject("S1")).can_write_catalog());
    }

    #[test]
    fn illegal_change_serializes_with_detail() {
        let reason = DropReason::IllegalChange {
            detail: "price changed".to_string(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["reason"], "illegal_change");
        assert_eq!(json["detail"], "price changed");
        assert_eq!(reason.to_string(), "illegal change: price changed");
    }

    #[test]
    fn collection_keys() {
        assert_eq!(Collection::Requests.key(), "requests");
        assert_eq!(Collection::Exercises.to_string(), "exercises");
        assert!(!Collection::Exercises.is_owned());
    }
}
