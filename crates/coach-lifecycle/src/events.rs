// events.rs — Lifecycle events and notification dispatch.
//
// The server derives events by comparing the request/program collections
// before and after a merge, then hands them to every registered sink.
// Sinks observe; a failing sink is logged and never blocks a push.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::program::Program;
use crate::request::{EngagementRequest, RequestStatus};

/// Events emitted at key lifecycle points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CoachEvent {
    RequestCreated {
        request_id: String,
        subject_id: String,
        timestamp: DateTime<Utc>,
    },

    StatusChanged {
        request_id: String,
        from_status: RequestStatus,
        to_status: RequestStatus,
        timestamp: DateTime<Utc>,
    },

    ProgramPublished {
        program_id: String,
        request_id: String,
        subject_id: String,
        timestamp: DateTime<Utc>,
    },

    MessagePosted {
        request_id: String,
        sender_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl CoachEvent {
    pub fn event_type(&self) -> &str {
        match self {
            CoachEvent::RequestCreated { .. } => "request_created",
            CoachEvent::StatusChanged { .. } => "status_changed",
            CoachEvent::ProgramPublished { .. } => "program_published",
            CoachEvent::MessagePosted { .. } => "message_posted",
        }
    }
}

/// Compare collections before and after a write and describe what happened.
///
/// New requests yield `RequestCreated`, status differences `StatusChanged`,
/// messages beyond the old count `MessagePosted`, and programs with new ids
/// `ProgramPublished`.
pub fn lifecycle_events(
    before_requests: &[EngagementRequest],
    after_requests: &[EngagementRequest],
    before_programs: &[Program],
    after_programs: &[Program],
) -> Vec<CoachEvent> {
    let now = Utc::now();
    let previous: HashMap<&str, &EngagementRequest> = before_requests
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect();
    let mut events = Vec::new();

    for request in after_requests {
        match previous.get(request.id.as_str()) {
            None => events.push(CoachEvent::RequestCreated {
                request_id: request.id.clone(),
                subject_id: request.subject_id.clone(),
                timestamp: now,
            }),
            Some(old) => {
                if old.status != request.status {
                    events.push(CoachEvent::StatusChanged {
                        request_id: request.id.clone(),
                        from_status: old.status,
                        to_status: request.status,
                        timestamp: now,
                    });
                }
                for message in request.messages.iter().skip(old.messages.len()) {
                    events.push(CoachEvent::MessagePosted {
                        request_id: request.id.clone(),
                        sender_id: message.sender_id.clone(),
                        timestamp: message.timestamp,
                    });
                }
            }
        }
    }

    for program in after_programs {
        if !before_programs.iter().any(|p| p.id == program.id) {
            events.push(CoachEvent::ProgramPublished {
                program_id: program.id.clone(),
                request_id: program.request_id.clone(),
                subject_id: program.subject_id.clone(),
                timestamp: now,
            });
        }
    }

    events
}

/// Trait for receiving lifecycle events.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged by the dispatcher, never raised.
    fn send(&self, event: &CoachEvent) -> Result<(), LifecycleError>;
}

/// Appends events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &CoachEvent) -> Result<(), LifecycleError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| LifecycleError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| LifecycleError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| LifecycleError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Dispatches events to every registered sink.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn dispatch(&self, event: &CoachEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event = event.event_type(), "notification sink error: {}", e);
            }
        }
    }

    pub fn dispatch_all(&self, events: &[CoachEvent]) {
        for event in events {
            self.dispatch(event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{authority, new_request, subject};
    use crate::request::{PaymentAccount, RequestAction};
    use tempfile::tempdir;

    #[test]
    fn new_request_and_status_change_detected() {
        let existing = new_request();
        let created = new_request();
        let priced = existing
            .apply(
                &authority(),
                RequestAction::SetPrice {
                    price: 100,
                    account: PaymentAccount::default(),
                },
            )
            .unwrap()
            .post_message(&authority(), "invoice sent")
            .unwrap();

        let events = lifecycle_events(
            &[existing.clone()],
            &[priced, created.clone()],
            &[],
            &[],
        );
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["status_changed", "message_posted", "request_created"]);
        assert!(matches!(
            &events[0],
            CoachEvent::StatusChanged {
                from_status: RequestStatus::Pending,
                to_status: RequestStatus::ApprovedWaitingPayment,
                ..
            }
        ));
    }

    #[test]
    fn unchanged_collections_produce_no_events() {
        let r = new_request().post_message(&subject(), "hi").unwrap();
        assert!(lifecycle_events(&[r.clone()], &[r], &[], &[]).is_empty());
    }

    #[test]
    fn dispatcher_writes_to_all_sinks() {
        let dir = tempdir().unwrap();
        let path1 = dir.path().join("a.jsonl");
        let path2 = dir.path().join("nested").join("b.jsonl");

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&path1)));
        dispatcher.add_sink(Box::new(LogSink::new(&path2)));

        let events = lifecycle_events(&[], &[new_request()], &[], &[]);
        dispatcher.dispatch_all(&events);

        assert!(fs::read_to_string(&path1).unwrap().contains("request_created"));
        assert!(fs::read_to_string(&path2).unwrap().contains("request_created"));
    }
}
