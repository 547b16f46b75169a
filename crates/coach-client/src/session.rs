// session.rs — ClientSession: the application store.
//
// Holds the collections loaded from `GET /data`. Each operation runs the
// pure lifecycle function, swaps the result into local state and asks the
// scheduler for a push. Subjects never push the catalog. `refresh` reloads
// the collections so the next push starts from what the server holds.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use coach_lifecycle::{
    CatalogEntry, EngagementRequest, LifecycleError, Program, ProgramBuilder, ProgressSample,
    RequestAction, RequestDetails, RequestStatus, StatusCounts,
};
use coach_policy::{Caller, Role};
use coach_sync::{DataView, PushBody};
use tokio::sync::watch;

use crate::error::ClientError;
use crate::http::{DataClient, SnapshotFetcher, SnapshotPusher};
use crate::scheduler::{PushScheduler, SyncState};

#[derive(Debug, Default)]
struct LocalState {
    requests: Vec<EngagementRequest>,
    programs: Vec<Program>,
    exercises: Vec<CatalogEntry>,
}

impl LocalState {
    fn snapshot(&self, role: Role) -> PushBody {
        PushBody {
            requests: Some(self.requests.clone()),
            programs: Some(self.programs.clone()),
            exercises: match role {
                Role::Authority => Some(self.exercises.clone()),
                Role::Subject => None,
            },
        }
    }
}

pub struct ClientSession {
    caller: Caller,
    state: Arc<Mutex<LocalState>>,
    builder: Option<ProgramBuilder>,
    scheduler: PushScheduler,
}

impl ClientSession {
    /// Build a session from a loaded data view.
    pub fn new(
        view: DataView,
        pusher: Arc<dyn SnapshotPusher>,
        debounce: std::time::Duration,
    ) -> Self {
        let caller = Caller {
            role: view.role,
            identity: view.current_user.id,
            name: view.current_user.name,
            email: view.current_user.email,
        };
        let state = Arc::new(Mutex::new(LocalState {
            requests: view.requests,
            programs: view.programs,
            exercises: view.exercises,
        }));

        let role = caller.role;
        let source = Arc::clone(&state);
        let snapshot = Arc::new(move || {
            source
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .snapshot(role)
        });

        Self {
            caller,
            state,
            builder: None,
            scheduler: PushScheduler::new(pusher, snapshot, debounce),
        }
    }

    /// Fetch the caller's data and open a session pushing through `client`.
    /// Keep a clone of `client` to pass to [`ClientSession::refresh`].
    pub async fn connect(client: Arc<DataClient>) -> Result<Self, ClientError> {
        let view = client.fetch().await?;
        let debounce = client.config().debounce();
        tracing::info!(
            identity = %view.current_user.id,
            role = %view.role,
            requests = view.requests.len(),
            "session loaded"
        );
        Ok(Self::new(view, client, debounce))
    }

    /// Reload every collection from the server.
    ///
    /// Local edits that have not been pushed are discarded along with the
    /// armed timer; `flush` first to keep them. The program builder survives
    /// only while its request is still `WAITING_FOR_PLAN`. If the fetch
    /// fails, nothing changes.
    pub async fn refresh(&mut self, fetcher: &dyn SnapshotFetcher) -> Result<(), ClientError> {
        let view = fetcher.fetch().await?;
        self.scheduler.cancel();

        let mut local = self.state.lock().unwrap_or_else(|e| e.into_inner());
        local.requests = view.requests;
        local.programs = view.programs;
        local.exercises = view.exercises;

        let still_waiting = self.builder.as_ref().is_some_and(|builder| {
            local.requests.iter().any(|r| {
                r.id == builder.request_id() && r.status == RequestStatus::WaitingForPlan
            })
        });
        if !still_waiting {
            self.builder = None;
        }

        tracing::info!(
            identity = %self.caller.identity,
            requests = local.requests.len(),
            builder_kept = still_waiting,
            "session refreshed"
        );
        Ok(())
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn requests(&self) -> Vec<EngagementRequest> {
        self.local().requests.clone()
    }

    pub fn programs(&self) -> Vec<Program> {
        self.local().programs.clone()
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.local().exercises.clone()
    }

    pub fn request(&self, request_id: &str) -> Option<EngagementRequest> {
        self.local()
            .requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
    }

    /// The caller's most recently created request.
    pub fn latest_request(&self) -> Option<EngagementRequest> {
        let local = self.local();
        EngagementRequest::latest_for_subject(&local.requests, &self.caller.identity).cloned()
    }

    pub fn program_for(&self, request_id: &str) -> Option<Program> {
        Program::for_request(&self.local().programs, request_id).cloned()
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.local().requests)
    }

    pub fn create_request(&self, details: RequestDetails) -> Result<EngagementRequest, ClientError> {
        let request = EngagementRequest::new(&self.caller, details)?;
        self.local().requests.push(request.clone());
        self.scheduler.schedule();
        Ok(request)
    }

    pub fn apply(
        &self,
        request_id: &str,
        action: RequestAction,
    ) -> Result<EngagementRequest, ClientError> {
        self.update_request(request_id, |r, caller| r.apply(caller, action))
    }

    pub fn post_message(
        &self,
        request_id: &str,
        text: &str,
    ) -> Result<EngagementRequest, ClientError> {
        self.update_request(request_id, |r, caller| r.post_message(caller, text))
    }

    pub fn mark_messages_read(&self, request_id: &str) -> Result<EngagementRequest, ClientError> {
        self.update_request(request_id, |r, caller| r.mark_messages_read(caller))
    }

    pub fn log_progress(
        &self,
        request_id: &str,
        sample: ProgressSample,
    ) -> Result<EngagementRequest, ClientError> {
        self.update_request(request_id, |r, caller| r.log_progress(caller, sample))
    }

    /// Open the program builder for a request in `WAITING_FOR_PLAN`.
    ///
    /// Builder edits are local working state and schedule no push.
    pub fn start_program(&mut self, request_id: &str) -> Result<&mut ProgramBuilder, ClientError> {
        let request = self
            .request(request_id)
            .ok_or_else(|| ClientError::RequestNotFound(request_id.to_string()))?;
        let builder = ProgramBuilder::start(&request, &self.caller)?;
        Ok(self.builder.insert(builder))
    }

    pub fn builder(&self) -> Option<&ProgramBuilder> {
        self.builder.as_ref()
    }

    pub fn builder_mut(&mut self) -> Option<&mut ProgramBuilder> {
        self.builder.as_mut()
    }

    /// Drop the in-progress program without publishing it.
    pub fn discard_program(&mut self) {
        self.builder = None;
    }

    /// Publish the in-progress program. On success the builder is discarded
    /// and the program plus the `PLAN_READY` request go out in one push.
    pub fn publish_program(&mut self, start_date: NaiveDate) -> Result<Program, ClientError> {
        let builder = self.builder.as_ref().ok_or(ClientError::NoProgramInProgress)?;
        let request = self
            .request(builder.request_id())
            .ok_or_else(|| ClientError::RequestNotFound(builder.request_id().to_string()))?;
        let publication = builder.publish(&request, &self.caller, start_date)?;

        {
            let mut local = self.local();
            if let Some(slot) = local.requests.iter_mut().find(|r| r.id == request.id) {
                *slot = publication.request;
            }
            local.programs.push(publication.program.clone());
        }
        self.builder = None;
        self.scheduler.schedule();
        Ok(publication.program)
    }

    /// Replace the catalog. Authority only.
    pub fn update_catalog(&self, entries: Vec<CatalogEntry>) -> Result<(), ClientError> {
        if self.caller.role != Role::Authority {
            return Err(ClientError::ReadOnlyCatalog);
        }
        self.local().exercises = entries;
        self.scheduler.schedule();
        Ok(())
    }

    pub fn sync_state(&self) -> SyncState {
        self.scheduler.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.scheduler.subscribe()
    }

    /// Push the current snapshot immediately.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.scheduler.flush().await
    }

    fn local(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update_request<F>(&self, request_id: &str, op: F) -> Result<EngagementRequest, ClientError>
    where
        F: FnOnce(&EngagementRequest, &Caller) -> Result<EngagementRequest, LifecycleError>,
    {
        let updated = {
            let mut local = self.local();
            let slot = local
                .requests
                .iter_mut()
                .find(|r| r.id == request_id)
                .ok_or_else(|| ClientError::RequestNotFound(request_id.to_string()))?;
            let updated = op(slot, &self.caller)?;
            *slot = updated.clone();
            updated
        };
        self.scheduler.schedule();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::RecordingPusher;
    use crate::scheduler::SyncStatus;
    use async_trait::async_trait;
    use coach_lifecycle::{BiometricProfile, DurationClass, PaymentAccount};
    use coach_sync::CurrentUser;
    use std::time::Duration;

    /// Serves a fixed view, or fails like an unreachable server.
    struct FixedFetcher(Option<DataView>);

    #[async_trait]
    impl SnapshotFetcher for FixedFetcher {
        async fn fetch(&self) -> Result<DataView, ClientError> {
            self.0
                .clone()
                .ok_or_else(|| ClientError::Connectivity("connection refused".into()))
        }
    }

    fn view(role: Role, id: &str) -> DataView {
        DataView {
            role,
            current_user: CurrentUser {
                id: id.to_string(),
                name: String::new(),
                email: String::new(),
            },
            requests: Vec::new(),
            programs: Vec::new(),
            exercises: vec![CatalogEntry::exercise("e1", "Squat", "legs")],
        }
    }

    fn details() -> RequestDetails {
        RequestDetails {
            subject_name: "Sara".to_string(),
            city: "Shiraz".to_string(),
            deliverable_type: "training".to_string(),
            level: "beginner".to_string(),
            sessions_per_week: 3,
            duration_class: DurationClass::TwelveWeeks,
        }
    }

    fn session(view: DataView, pusher: &Arc<RecordingPusher>) -> ClientSession {
        ClientSession::new(view, pusher.clone(), Duration::from_millis(2000))
    }

    #[tokio::test(start_paused = true)]
    async fn subject_push_never_includes_catalog() {
        let pusher = Arc::new(RecordingPusher::default());
        let s = session(view(Role::Subject, "S1"), &pusher);

        let request = s.create_request(details()).unwrap();
        assert_eq!(s.sync_state().status(), SyncStatus::Pending);
        s.post_message(&request.id, "hello").unwrap();
        tokio::time::sleep(Duration::from_millis(2100)).await;

        let bodies = pusher.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].exercises.is_none());
        let pushed = bodies[0].requests.as_ref().unwrap();
        assert_eq!(pushed[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn subject_cannot_edit_catalog() {
        let pusher = Arc::new(RecordingPusher::default());
        let s = session(view(Role::Subject, "S1"), &pusher);
        assert!(matches!(
            s.update_catalog(Vec::new()),
            Err(ClientError::ReadOnlyCatalog)
        ));
        assert_eq!(s.catalog().len(), 1);
    }

    #[tokio::test]
    async fn invalid_transition_leaves_local_state_untouched() {
        let pusher = Arc::new(RecordingPusher::default());
        let mut v = view(Role::Authority, "ADMIN");
        let request = EngagementRequest::new(&Caller::subject("S1"), details()).unwrap();
        v.requests.push(request.clone());
        let s = session(v, &pusher);

        let err = s.apply(&request.id, RequestAction::ApproveReceipt).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(s.requests(), vec![request]);
        assert_eq!(s.sync_state().status(), SyncStatus::Idle);
    }

    fn waiting_for_plan() -> EngagementRequest {
        let subject = Caller::subject("S1");
        let admin = Caller::authority("ADMIN");
        EngagementRequest::new(&subject, details())
            .unwrap()
            .apply(
                &admin,
                RequestAction::SetPrice {
                    price: 850_000,
                    account: PaymentAccount::default(),
                },
            )
            .unwrap()
            .apply(
                &subject,
                RequestAction::UploadReceipt {
                    receipt_ref: "img:r1".to_string(),
                },
            )
            .unwrap()
            .apply(&admin, RequestAction::ApproveReceipt)
            .unwrap()
            .apply(
                &subject,
                RequestAction::SubmitProfile {
                    profile: BiometricProfile::default(),
                },
            )
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn authority_publishes_program_and_pushes_both_collections() {
        let waiting = waiting_for_plan();

        let pusher = Arc::new(RecordingPusher::default());
        let mut v = view(Role::Authority, "ADMIN");
        v.requests.push(waiting.clone());
        let mut s = session(v, &pusher);

        let builder = s.start_program(&waiting.id).unwrap();
        let day = builder.days()[0].id.clone();
        builder.add_row(&day, 0).unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let program = s.publish_program(start).unwrap();

        assert!(s.builder().is_none());
        assert_eq!(program.end_date, NaiveDate::from_ymd_opt(2026, 3, 26).unwrap());
        assert_eq!(
            s.request(&waiting.id).unwrap().status,
            RequestStatus::PlanReady
        );

        s.flush().await.unwrap();
        let bodies = pusher.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].programs.as_ref().unwrap().len(), 1);
        assert!(bodies[0].exercises.is_some());
    }

    #[tokio::test]
    async fn publish_without_builder_fails() {
        let pusher = Arc::new(RecordingPusher::default());
        let mut s = session(view(Role::Authority, "ADMIN"), &pusher);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(matches!(
            s.publish_program(start),
            Err(ClientError::NoProgramInProgress)
        ));
    }

    #[tokio::test]
    async fn latest_request_is_most_recent_own_request() {
        let pusher = Arc::new(RecordingPusher::default());
        let s = session(view(Role::Subject, "S1"), &pusher);
        s.create_request(details()).unwrap();
        let second = s.create_request(details()).unwrap();
        assert_eq!(s.latest_request().unwrap().id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_local_state_and_disarms_timer() {
        let pusher = Arc::new(RecordingPusher::default());
        let mut s = session(view(Role::Authority, "ADMIN"), &pusher);
        s.update_catalog(Vec::new()).unwrap();
        assert_eq!(s.sync_state().status(), SyncStatus::Pending);

        let mut server = view(Role::Authority, "ADMIN");
        let created_elsewhere = EngagementRequest::new(&Caller::subject("S2"), details()).unwrap();
        server.requests.push(created_elsewhere.clone());
        s.refresh(&FixedFetcher(Some(server))).await.unwrap();

        assert_eq!(s.requests(), vec![created_elsewhere]);
        assert_eq!(s.catalog().len(), 1);
        assert_eq!(s.sync_state().status(), SyncStatus::Idle);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(pusher.count(), 0);
    }

    #[tokio::test]
    async fn refresh_keeps_builder_only_while_request_waits_for_plan() {
        let waiting = waiting_for_plan();
        let pusher = Arc::new(RecordingPusher::default());
        let mut v = view(Role::Authority, "ADMIN");
        v.requests.push(waiting.clone());
        let mut s = session(v.clone(), &pusher);
        s.start_program(&waiting.id).unwrap();

        s.refresh(&FixedFetcher(Some(v.clone()))).await.unwrap();
        assert!(s.builder().is_some());

        let mut published = v;
        published.requests[0].status = RequestStatus::PlanReady;
        s.refresh(&FixedFetcher(Some(published))).await.unwrap();
        assert!(s.builder().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_changes_nothing() {
        let pusher = Arc::new(RecordingPusher::default());
        let mut s = session(view(Role::Subject, "S1"), &pusher);
        let request = s.create_request(details()).unwrap();

        let err = s.refresh(&FixedFetcher(None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Connectivity(_)));
        assert_eq!(s.requests(), vec![request]);
        assert_eq!(s.sync_state().status(), SyncStatus::Pending);
    }
}
