// service.rs — SyncService: load and push against an option store.
//
// Each push reads the persisted collections, merges the incoming snapshot,
// audits the outcome, then writes. One lock spans read → merge → write so
// two pushes never merge against the same stale read. Pushes carry no
// version token: a push is checked against what is stored, not against
// what its sender last saw.

use std::sync::Mutex;

use coach_audit::{AuditAction, AuditEvent, AuditLog};
use coach_lifecycle::{lifecycle_events, CatalogEntry, EngagementRequest, EventDispatcher, Program};
use coach_policy::{AuthorizationScope, Caller, Collection};
use serde::Serialize;

use crate::error::SyncError;
use crate::merge::{merge_catalog, merge_owned, MergeMode, MergeReport};
use crate::store::{read_collection, write_collection, OptionStore};
use crate::wire::{CurrentUser, DataView, PushBody};

/// Per-collection outcome of one push.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PushSummary {
    pub reports: Vec<MergeReport>,
}

impl PushSummary {
    pub fn report(&self, collection: Collection) -> Option<&MergeReport> {
        self.reports.iter().find(|r| r.collection == collection)
    }

    pub fn dropped_count(&self) -> usize {
        self.reports.iter().map(|r| r.dropped.len()).sum()
    }
}

pub struct SyncService<S: OptionStore> {
    store: S,
    audit: Option<Mutex<AuditLog>>,
    dispatcher: EventDispatcher,
    push_lock: Mutex<()>,
}

impl<S: OptionStore> SyncService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: None,
            dispatcher: EventDispatcher::new(),
            push_lock: Mutex::new(()),
        }
    }

    /// Record merge decisions and dropped records in `log`.
    pub fn with_audit_log(mut self, log: AuditLog) -> Self {
        self.audit = Some(Mutex::new(log));
        self
    }

    /// Send lifecycle events derived from each push to `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Everything `caller` may read.
    pub fn load(&self, caller: &Caller) -> Result<DataView, SyncError> {
        let scope = AuthorizationScope::for_caller(caller);
        let requests: Vec<EngagementRequest> = read_collection(&self.store, Collection::Requests)?;
        let programs: Vec<Program> = read_collection(&self.store, Collection::Programs)?;
        let exercises: Vec<CatalogEntry> = read_collection(&self.store, Collection::Exercises)?;

        Ok(DataView {
            role: caller.role,
            current_user: CurrentUser::from(caller),
            requests: scope.filter_readable(requests),
            programs: scope.filter_readable(programs),
            exercises,
        })
    }

    /// Merge every collection present in `body`.
    ///
    /// Audit entries for every merged collection are appended before any
    /// collection is written, so a failing audit log leaves the store as
    /// it was.
    pub fn push(&self, caller: &Caller, body: PushBody) -> Result<PushSummary, SyncError> {
        let scope = AuthorizationScope::for_caller(caller);
        let _guard = self.push_lock.lock().unwrap_or_else(|e| e.into_inner());

        let before_requests: Vec<EngagementRequest> =
            read_collection(&self.store, Collection::Requests)?;
        let before_programs: Vec<Program> = read_collection(&self.store, Collection::Programs)?;

        let requests = body.requests.map(|incoming| {
            merge_owned(&scope, Collection::Requests, before_requests.clone(), incoming)
        });
        let programs = body.programs.map(|incoming| {
            merge_owned(&scope, Collection::Programs, before_programs.clone(), incoming)
        });
        let exercises = match body.exercises {
            Some(incoming) => {
                let persisted: Vec<CatalogEntry> =
                    read_collection(&self.store, Collection::Exercises)?;
                Some(merge_catalog(&scope, persisted, incoming))
            }
            None => None,
        };

        let reports = requests
            .iter()
            .map(|(_, report)| report)
            .chain(programs.iter().map(|(_, report)| report))
            .chain(exercises.iter().map(|(_, report)| report));
        for report in reports {
            self.record(caller, report)?;
        }

        let mut summary = PushSummary::default();
        let mut after_requests = before_requests.clone();
        let mut after_programs = before_programs.clone();

        if let Some((merged, report)) = requests {
            write_collection(&self.store, Collection::Requests, &merged)?;
            after_requests = merged;
            summary.reports.push(report);
        }
        if let Some((merged, report)) = programs {
            write_collection(&self.store, Collection::Programs, &merged)?;
            after_programs = merged;
            summary.reports.push(report);
        }
        if let Some((merged, report)) = exercises {
            if report.mode != MergeMode::Ignored {
                write_collection(&self.store, Collection::Exercises, &merged)?;
            }
            summary.reports.push(report);
        }

        let events = lifecycle_events(
            &before_requests,
            &after_requests,
            &before_programs,
            &after_programs,
        );
        self.dispatcher.dispatch_all(&events);

        Ok(summary)
    }

    fn record(&self, caller: &Caller, report: &MergeReport) -> Result<(), SyncError> {
        let collection = report.collection.key();
        match report.mode {
            MergeMode::Replaced => tracing::info!(
                actor = %caller.identity,
                collection,
                records = report.persisted,
                "collection replaced"
            ),
            MergeMode::Merged => tracing::info!(
                actor = %caller.identity,
                collection,
                accepted = report.accepted,
                dropped = report.dropped.len(),
                "collection merged"
            ),
            MergeMode::Ignored => {
                tracing::warn!(actor = %caller.identity, "catalog push from subject ignored")
            }
        }
        for dropped in &report.dropped {
            tracing::warn!(
                actor = %caller.identity,
                collection,
                record_id = %dropped.record_id,
                reason = %dropped.reason,
                "write rejected"
            );
        }

        let Some(audit) = &self.audit else {
            return Ok(());
        };
        let mut log = audit.lock().unwrap_or_else(|e| e.into_inner());

        let action = match report.mode {
            MergeMode::Replaced => AuditAction::CollectionReplaced,
            MergeMode::Merged => AuditAction::CollectionMerged,
            MergeMode::Ignored => AuditAction::CatalogWriteIgnored,
        };
        let mut event = AuditEvent::new(&caller.identity, action)
            .with_collection(collection)
            .with_metadata(serde_json::json!({
                "accepted": report.accepted,
                "dropped": report.dropped.len(),
                "persisted": report.persisted,
            }));
        log.append(&mut event)?;

        for dropped in &report.dropped {
            let mut event = AuditEvent::new(&caller.identity, AuditAction::WriteRejected)
                .with_collection(collection)
                .with_record(&dropped.record_id)
                .with_metadata(serde_json::to_value(&dropped.reason)?);
            log.append(&mut event)?;
        }
        Ok(())
    }
}
