// scheduler.rs — PushScheduler: trailing-edge debounce for snapshot pushes.
//
// `schedule()` cancels the armed timer and arms a new one. When a timer
// fires it takes the snapshot at that moment and pushes it. Only the timer
// is cancellable; a push already on the wire always runs to completion.
// Failed pushes are recorded in the state and never retried: the next
// mutation schedules a push that carries the newer full snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use coach_sync::PushBody;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::http::SnapshotPusher;

/// Produces the full snapshot to push, read at the moment a push starts.
pub type SnapshotFn = Arc<dyn Fn() -> PushBody + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    /// A timer is armed.
    Pending,
    /// At least one push is on the wire.
    Syncing,
}

/// Observable sync indicator.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncState {
    pub pending: bool,
    pub in_flight: u32,
    /// Error text of the most recent push if it failed. Cleared by a success.
    pub last_failure: Option<String>,
    pub completed_pushes: u64,
    pub failed_pushes: u64,
}

impl SyncState {
    pub fn status(&self) -> SyncStatus {
        if self.pending {
            SyncStatus::Pending
        } else if self.in_flight > 0 {
            SyncStatus::Syncing
        } else {
            SyncStatus::Idle
        }
    }
}

pub struct PushScheduler {
    pusher: Arc<dyn SnapshotPusher>,
    snapshot: SnapshotFn,
    debounce: Duration,
    state: Arc<watch::Sender<SyncState>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PushScheduler {
    pub fn new(pusher: Arc<dyn SnapshotPusher>, snapshot: SnapshotFn, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            pusher,
            snapshot,
            debounce,
            state: Arc::new(state),
            timer: Mutex::new(None),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Arm (or re-arm) the debounce timer. Must be called inside a Tokio runtime.
    pub fn schedule(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(armed) = timer.take() {
            armed.abort();
        }
        self.state.send_modify(|s| s.pending = true);

        let pusher = Arc::clone(&self.pusher);
        let snapshot = Arc::clone(&self.snapshot);
        let state = Arc::clone(&self.state);
        let debounce = self.debounce;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let body = begin_push(&state, &snapshot);
            // Detached so a later re-arm cannot cancel a push on the wire.
            tokio::spawn(async move {
                let _ = finish_push(pusher.as_ref(), body, &state).await;
            });
        }));
    }

    /// Cancel the armed timer, if any, and push the current snapshot now.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.cancel();
        let body = begin_push(&self.state, &self.snapshot);
        finish_push(self.pusher.as_ref(), body, &self.state).await
    }

    /// Disarm the timer without pushing.
    pub fn cancel(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(armed) = timer.take() {
            armed.abort();
        }
        self.state.send_modify(|s| s.pending = false);
    }
}

impl Drop for PushScheduler {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(armed) = timer.take() {
            armed.abort();
        }
    }
}

fn begin_push(state: &watch::Sender<SyncState>, snapshot: &SnapshotFn) -> PushBody {
    state.send_modify(|s| {
        s.pending = false;
        s.in_flight += 1;
    });
    snapshot()
}

async fn finish_push(
    pusher: &dyn SnapshotPusher,
    body: PushBody,
    state: &watch::Sender<SyncState>,
) -> Result<(), ClientError> {
    let result = pusher.push(body).await;
    state.send_modify(|s| {
        s.in_flight = s.in_flight.saturating_sub(1);
        match &result {
            Ok(()) => {
                s.completed_pushes += 1;
                s.last_failure = None;
            }
            Err(e) => {
                s.failed_pushes += 1;
                s.last_failure = Some(e.to_string());
            }
        }
    });
    if let Err(e) = &result {
        tracing::warn!("snapshot push failed: {}", e);
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Records every pushed body; fails while `failing` is set.
    #[derive(Default)]
    pub(crate) struct RecordingPusher {
        pub(crate) bodies: Mutex<Vec<PushBody>>,
        pub(crate) failing: AtomicBool,
    }

    impl RecordingPusher {
        pub(crate) fn count(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SnapshotPusher for RecordingPusher {
        async fn push(&self, body: PushBody) -> Result<(), ClientError> {
            self.bodies.lock().unwrap().push(body);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Connectivity("server answered HTTP 500".into()));
            }
            Ok(())
        }
    }

    /// Snapshot whose catalog length encodes a counter, so tests can tell
    /// which snapshot was pushed.
    fn counting_snapshot(counter: Arc<AtomicU32>) -> SnapshotFn {
        Arc::new(move || PushBody {
            exercises: Some(
                (0..counter.load(Ordering::SeqCst))
                    .map(|i| coach_lifecycle::CatalogEntry::exercise(i.to_string(), "x", ""))
                    .collect(),
            ),
            ..Default::default()
        })
    }

    fn scheduler(pusher: Arc<RecordingPusher>, counter: Arc<AtomicU32>) -> PushScheduler {
        PushScheduler::new(pusher, counting_snapshot(counter), Duration::from_millis(2000))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_mutations_collapses_into_one_push() {
        let pusher = Arc::new(RecordingPusher::default());
        let sched = scheduler(pusher.clone(), Arc::new(AtomicU32::new(0)));

        sched.schedule();
        tokio::time::sleep(Duration::from_millis(500)).await;
        sched.schedule();
        tokio::time::sleep(Duration::from_millis(500)).await;
        sched.schedule();

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(pusher.count(), 0);
        assert_eq!(sched.state().status(), SyncStatus::Pending);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pusher.count(), 1);
        assert_eq!(sched.state().status(), SyncStatus::Idle);
        assert_eq!(sched.state().completed_pushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn push_carries_snapshot_taken_when_timer_fires() {
        let pusher = Arc::new(RecordingPusher::default());
        let counter = Arc::new(AtomicU32::new(1));
        let sched = scheduler(pusher.clone(), counter.clone());

        sched.schedule();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        counter.store(3, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let bodies = pusher.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].exercises.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_is_recorded_and_not_retried() {
        let pusher = Arc::new(RecordingPusher::default());
        pusher.failing.store(true, Ordering::SeqCst);
        let sched = scheduler(pusher.clone(), Arc::new(AtomicU32::new(0)));

        sched.schedule();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        let state = sched.state();
        assert_eq!(state.status(), SyncStatus::Idle);
        assert_eq!(state.failed_pushes, 1);
        assert!(state.last_failure.is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pusher.count(), 1);

        // The next mutation pushes again and a success clears the failure.
        pusher.failing.store(false, Ordering::SeqCst);
        sched.schedule();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(pusher.count(), 2);
        assert!(sched.state().last_failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_pushes_now_and_disarms_timer() {
        let pusher = Arc::new(RecordingPusher::default());
        let sched = scheduler(pusher.clone(), Arc::new(AtomicU32::new(0)));

        sched.schedule();
        sched.flush().await.unwrap();
        assert_eq!(pusher.count(), 1);
        assert_eq!(sched.state().status(), SyncStatus::Idle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(pusher.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_pending_state() {
        let pusher = Arc::new(RecordingPusher::default());
        let sched = scheduler(pusher, Arc::new(AtomicU32::new(0)));
        let rx = sched.subscribe();

        sched.schedule();
        assert_eq!(rx.borrow().status(), SyncStatus::Pending);
    }
}
