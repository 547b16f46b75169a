// merge.rs — The per-collection merge applied to every pushed snapshot.
//
//   authority  incoming replaces persisted
//   subject    persisted map keyed by id; each incoming record is written
//              only if the scope accepts the owner and the record type
//              accepts the field changes; only the subject-writable fields
//              land on a persisted record; unmentioned records stay
//   catalog    authority replaces; a subject push changes nothing
//
// Persisted order is kept. Records new to the collection are appended in
// the order they arrived.

use std::collections::HashMap;

use coach_lifecycle::CatalogEntry;
use coach_policy::{
    AuthorizationScope, Collection, DropReason, OwnedRecord, SubjectWritable, WriteDecision,
};
use serde::Serialize;

/// How a pushed collection was applied.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    Replaced,
    Merged,
    Ignored,
}

/// A record from the incoming snapshot that was not written.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DroppedRecord {
    pub record_id: String,
    pub reason: DropReason,
}

/// Outcome of merging one collection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MergeReport {
    pub collection: Collection,
    pub mode: MergeMode,
    /// Incoming records written to the collection.
    pub accepted: usize,
    pub dropped: Vec<DroppedRecord>,
    /// Size of the collection after the merge.
    pub persisted: usize,
}

/// Merge a snapshot of an owned collection into the persisted records.
pub fn merge_owned<R>(
    scope: &AuthorizationScope,
    collection: Collection,
    persisted: Vec<R>,
    incoming: Vec<R>,
) -> (Vec<R>, MergeReport)
where
    R: OwnedRecord + SubjectWritable,
{
    if scope.replaces_wholesale() {
        let accepted = incoming.len();
        let report = MergeReport {
            collection,
            mode: MergeMode::Replaced,
            accepted,
            dropped: Vec::new(),
            persisted: accepted,
        };
        return (incoming, report);
    }

    let mut merged = persisted;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, r)| (r.record_id().to_string(), i))
        .collect();
    let mut accepted = 0;
    let mut dropped = Vec::new();

    for record in incoming {
        let record_id = record.record_id().to_string();
        let slot = index.get(&record_id).copied();
        let decision = scope.write_decision(&record, slot.map(|i| &merged[i]));
        let outcome = match decision {
            WriteDecision::Drop(reason) => Err(reason),
            WriteDecision::Accept => {
                let checked = match slot {
                    Some(i) => merged[i].apply_subject_write(record),
                    None => record.check_subject_create().map(|()| record),
                };
                checked.map_err(|detail| DropReason::IllegalChange { detail })
            }
        };

        match outcome {
            Ok(record) => {
                accepted += 1;
                match slot {
                    Some(i) => merged[i] = record,
                    None => {
                        index.insert(record_id, merged.len());
                        merged.push(record);
                    }
                }
            }
            Err(reason) => dropped.push(DroppedRecord { record_id, reason }),
        }
    }

    let report = MergeReport {
        collection,
        mode: MergeMode::Merged,
        accepted,
        dropped,
        persisted: merged.len(),
    };
    (merged, report)
}

/// Merge a catalog snapshot. Only the authority's push has any effect.
pub fn merge_catalog(
    scope: &AuthorizationScope,
    persisted: Vec<CatalogEntry>,
    incoming: Vec<CatalogEntry>,
) -> (Vec<CatalogEntry>, MergeReport) {
    if scope.can_write_catalog() {
        let accepted = incoming.len();
        let report = MergeReport {
            collection: Collection::Exercises,
            mode: MergeMode::Replaced,
            accepted,
            dropped: Vec::new(),
            persisted: accepted,
        };
        return (incoming, report);
    }

    let report = MergeReport {
        collection: Collection::Exercises,
        mode: MergeMode::Ignored,
        accepted: 0,
        dropped: Vec::new(),
        persisted: persisted.len(),
    };
    (persisted, report)
}
