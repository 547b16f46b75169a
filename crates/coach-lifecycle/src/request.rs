// request.rs — EngagementRequest: one coaching request from creation to a
// published program.
//
// The state machine:
//   PENDING → APPROVED_WAITING_PAYMENT → PAYMENT_UPLOADED → PAYMENT_APPROVED
//     → WAITING_FOR_PLAN → PLAN_READY
//   PENDING → REJECTED                               (request rejected)
//   PAYMENT_UPLOADED → APPROVED_WAITING_PAYMENT      (receipt rejected)
//
// Transitions are pure: `apply` returns a new record and leaves `self`
// untouched, so a failed transition can never half-mutate a request.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use coach_policy::{Caller, OwnedRecord, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::profile::{BiometricProfile, Message, ProgressSample};

/// The lifecycle state of an engagement request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Submitted by the subject, waiting for the authority to price it.
    Pending,
    /// Priced; the subject owes payment.
    ApprovedWaitingPayment,
    /// The subject attached a receipt; the authority has to review it.
    PaymentUploaded,
    /// Receipt accepted; the subject owes a biometric profile.
    PaymentApproved,
    /// Profile received; the authority is authoring the program.
    WaitingForPlan,
    /// Program published. Terminal.
    PlanReady,
    /// Rejected before pricing. Terminal.
    Rejected,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::ApprovedWaitingPayment => "APPROVED_WAITING_PAYMENT",
            RequestStatus::PaymentUploaded => "PAYMENT_UPLOADED",
            RequestStatus::PaymentApproved => "PAYMENT_APPROVED",
            RequestStatus::WaitingForPlan => "WAITING_FOR_PLAN",
            RequestStatus::PlanReady => "PLAN_READY",
            RequestStatus::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Pending,
        RequestStatus::ApprovedWaitingPayment,
        RequestStatus::PaymentUploaded,
        RequestStatus::PaymentApproved,
        RequestStatus::WaitingForPlan,
        RequestStatus::PlanReady,
        RequestStatus::Rejected,
    ];

    /// Check whether `next` is an edge of the lifecycle graph from `self`.
    pub fn can_transition_to(&self, next: &RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, ApprovedWaitingPayment)
                | (Pending, Rejected)
                | (ApprovedWaitingPayment, PaymentUploaded)
                | (PaymentUploaded, ApprovedWaitingPayment)
                | (PaymentUploaded, PaymentApproved)
                | (PaymentApproved, WaitingForPlan)
                | (WaitingForPlan, PlanReady)
        )
    }

    /// Whether `target` can be reached from `self` along one or more edges.
    pub fn reaches(&self, target: &RequestStatus) -> bool {
        let mut seen = vec![*self];
        let mut frontier = vec![*self];
        while let Some(status) = frontier.pop() {
            for next in RequestStatus::ALL {
                if !status.can_transition_to(&next) {
                    continue;
                }
                if next == *target {
                    return true;
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        false
    }

    /// Terminal states have no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::PlanReady | RequestStatus::Rejected)
    }
}

/// Length of the program a subject asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DurationClass {
    FourWeeks,
    TwelveWeeks,
}

impl DurationClass {
    pub fn weeks(&self) -> i64 {
        match self {
            DurationClass::FourWeeks => 4,
            DurationClass::TwelveWeeks => 12,
        }
    }
}

/// Where the subject should send payment. Written together with the price.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccount {
    pub card_number: String,
    pub account_name: String,
}

/// Descriptive fields captured at creation and never changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub subject_name: String,
    pub city: String,
    pub deliverable_type: String,
    pub level: String,
    pub sessions_per_week: u8,
    pub duration_class: DurationClass,
}

/// An action one of the two roles takes on a request.
///
/// Each action has exactly one source state and one target state. Program
/// publication is not an action here: it goes through
/// [`crate::ProgramBuilder::publish`] so the program and the status change
/// are produced together.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestAction {
    /// Authority prices the request and names the payment account.
    SetPrice { price: u64, account: PaymentAccount },
    /// Authority rejects a pending request.
    Reject,
    /// Subject attaches a payment receipt reference.
    UploadReceipt { receipt_ref: String },
    /// Authority rejects the receipt; the price stays, the receipt is cleared.
    RejectReceipt,
    /// Authority accepts the receipt.
    ApproveReceipt,
    /// Subject submits the biometric profile.
    SubmitProfile { profile: BiometricProfile },
}

impl RequestAction {
    pub fn name(&self) -> &'static str {
        match self {
            RequestAction::SetPrice { .. } => "set_price",
            RequestAction::Reject => "reject",
            RequestAction::UploadReceipt { .. } => "upload_receipt",
            RequestAction::RejectReceipt => "reject_receipt",
            RequestAction::ApproveReceipt => "approve_receipt",
            RequestAction::SubmitProfile { .. } => "submit_profile",
        }
    }

    /// The role allowed to take this action.
    pub fn actor(&self) -> Role {
        match self {
            RequestAction::UploadReceipt { .. } | RequestAction::SubmitProfile { .. } => {
                Role::Subject
            }
            _ => Role::Authority,
        }
    }

    pub fn source(&self) -> RequestStatus {
        match self {
            RequestAction::SetPrice { .. } | RequestAction::Reject => RequestStatus::Pending,
            RequestAction::UploadReceipt { .. } => RequestStatus::ApprovedWaitingPayment,
            RequestAction::RejectReceipt | RequestAction::ApproveReceipt => {
                RequestStatus::PaymentUploaded
            }
            RequestAction::SubmitProfile { .. } => RequestStatus::PaymentApproved,
        }
    }

    pub fn target(&self) -> RequestStatus {
        match self {
            RequestAction::SetPrice { .. } | RequestAction::RejectReceipt => {
                RequestStatus::ApprovedWaitingPayment
            }
            RequestAction::Reject => RequestStatus::Rejected,
            RequestAction::UploadReceipt { .. } => RequestStatus::PaymentUploaded,
            RequestAction::ApproveReceipt => RequestStatus::PaymentApproved,
            RequestAction::SubmitProfile { .. } => RequestStatus::WaitingForPlan,
        }
    }
}

/// One coaching request from a subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRequest {
    pub id: String,

    /// Ownership field. Never changes after creation.
    pub subject_id: String,

    #[serde(flatten)]
    pub details: RequestDetails,

    pub status: RequestStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,

    #[serde(
        default,
        rename = "paymentAccountRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_account: Option<PaymentAccount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub progress_log: Vec<ProgressSample>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_profile: Option<BiometricProfile>,
}

impl OwnedRecord for EngagementRequest {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.subject_id
    }
}

impl EngagementRequest {
    /// Create a new request in `PENDING`, owned by the calling subject.
    pub fn new(subject: &Caller, details: RequestDetails) -> Result<Self, LifecycleError> {
        let id = Uuid::new_v4().to_string();
        if subject.role != Role::Subject {
            return Err(LifecycleError::ActorNotAllowed {
                request_id: id,
                actor: subject.role.to_string(),
                action: "create".to_string(),
            });
        }
        Ok(Self {
            id,
            subject_id: subject.identity.clone(),
            details,
            status: RequestStatus::Pending,
            price: None,
            payment_account: None,
            receipt_ref: None,
            created_at: Utc::now(),
            messages: Vec::new(),
            progress_log: Vec::new(),
            biometric_profile: None,
        })
    }

    /// Apply an action and return the resulting record.
    ///
    /// The edge is checked first, so any transition not in the graph fails
    /// with `InvalidTransition` regardless of who asked for it.
    pub fn apply(&self, caller: &Caller, action: RequestAction) -> Result<Self, LifecycleError> {
        let target = action.target();
        self.check_edge(action.source(), target)?;
        self.check_actor(caller, action.actor(), action.name())?;

        let mut next = self.clone();
        match action {
            RequestAction::SetPrice { price, account } => {
                if price == 0 {
                    return Err(LifecycleError::InvalidPrice);
                }
                next.price = Some(price);
                next.payment_account = Some(account);
            }
            RequestAction::Reject => {}
            RequestAction::UploadReceipt { receipt_ref } => {
                if receipt_ref.trim().is_empty() {
                    return Err(LifecycleError::EmptyReceipt);
                }
                next.receipt_ref = Some(receipt_ref);
            }
            RequestAction::RejectReceipt => {
                next.receipt_ref = None;
            }
            RequestAction::ApproveReceipt => {}
            RequestAction::SubmitProfile { profile } => {
                profile.validate()?;
                next.biometric_profile = Some(profile);
            }
        }
        next.status = target;
        Ok(next)
    }

    /// `WAITING_FOR_PLAN → PLAN_READY`. Only the program builder calls this,
    /// alongside creating the program record.
    pub(crate) fn mark_plan_ready(&self, caller: &Caller) -> Result<Self, LifecycleError> {
        self.check_edge(RequestStatus::WaitingForPlan, RequestStatus::PlanReady)?;
        self.check_actor(caller, Role::Authority, "publish_program")?;
        let mut next = self.clone();
        next.status = RequestStatus::PlanReady;
        Ok(next)
    }

    /// Append a chat message. Either the authority or the owning subject may post.
    pub fn post_message(&self, caller: &Caller, text: &str) -> Result<Self, LifecycleError> {
        self.check_participant(caller)?;
        if text.trim().is_empty() {
            return Err(LifecycleError::EmptyMessage);
        }
        let mut next = self.clone();
        next.messages.push(Message::new(caller.identity.clone(), text));
        Ok(next)
    }

    /// Mark every message sent by the other party as read.
    pub fn mark_messages_read(&self, reader: &Caller) -> Result<Self, LifecycleError> {
        self.check_participant(reader)?;
        let mut next = self.clone();
        for message in next
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != reader.identity)
        {
            message.is_read = true;
        }
        Ok(next)
    }

    /// Number of messages from the other party that `reader` has not read.
    pub fn unread_count(&self, reader: &Caller) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id != reader.identity && !m.is_read)
            .count()
    }

    /// Append a progress sample. Only the owning subject logs progress.
    pub fn log_progress(
        &self,
        caller: &Caller,
        sample: ProgressSample,
    ) -> Result<Self, LifecycleError> {
        self.check_actor(caller, Role::Subject, "log_progress")?;
        if !(sample.weight.is_finite() && sample.weight > 0.0) {
            return Err(LifecycleError::InvalidWeight(sample.weight));
        }
        let mut next = self.clone();
        next.progress_log.push(sample);
        Ok(next)
    }

    /// The most recent progress sample on or before `date`, if any.
    pub fn weight_on(&self, date: NaiveDate) -> Option<f64> {
        self.progress_log
            .iter()
            .filter(|s| s.date <= date)
            .max_by_key(|s| s.date)
            .map(|s| s.weight)
    }

    /// The subject-facing "latest request": the most recently created
    /// request owned by `subject_id`. Ties on `created_at` go to the one
    /// later in the slice.
    pub fn latest_for_subject<'a>(
        requests: &'a [EngagementRequest],
        subject_id: &str,
    ) -> Option<&'a EngagementRequest> {
        requests
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .fold(None, |best: Option<&EngagementRequest>, r| match best {
                Some(b) if b.created_at > r.created_at => Some(b),
                _ => Some(r),
            })
    }

    fn check_edge(&self, from: RequestStatus, to: RequestStatus) -> Result<(), LifecycleError> {
        if self.status != from || !self.status.can_transition_to(&to) {
            return Err(LifecycleError::InvalidTransition {
                request_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    fn check_actor(&self, caller: &Caller, role: Role, action: &str) -> Result<(), LifecycleError> {
        if caller.role != role {
            return Err(LifecycleError::ActorNotAllowed {
                request_id: self.id.clone(),
                actor: caller.role.to_string(),
                action: action.to_string(),
            });
        }
        if role == Role::Subject && caller.identity != self.subject_id {
            return Err(LifecycleError::NotOwner {
                request_id: self.id.clone(),
                identity: caller.identity.clone(),
            });
        }
        Ok(())
    }

    fn check_participant(&self, caller: &Caller) -> Result<(), LifecycleError> {
        match caller.role {
            Role::Authority => Ok(()),
            Role::Subject if caller.identity == self.subject_id => Ok(()),
            Role::Subject => Err(LifecycleError::NotOwner {
                request_id: self.id.clone(),
                identity: caller.identity.clone(),
            }),
        }
    }
}

/// Per-status tallies for the authority's overview.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub awaiting_payment: usize,
    pub receipts_to_review: usize,
    pub awaiting_profile: usize,
    pub waiting_for_plan: usize,
    pub active: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally(requests: &[EngagementRequest]) -> Self {
        let mut counts = Self::default();
        for request in requests {
            let slot = match request.status {
                RequestStatus::Pending => &mut counts.pending,
                RequestStatus::ApprovedWaitingPayment => &mut counts.awaiting_payment,
                RequestStatus::PaymentUploaded => &mut counts.receipts_to_review,
                RequestStatus::PaymentApproved => &mut counts.awaiting_profile,
                RequestStatus::WaitingForPlan => &mut counts.waiting_for_plan,
                RequestStatus::PlanReady => &mut counts.active,
                RequestStatus::Rejected => &mut counts.rejected,
            };
            *slot += 1;
        }
        counts
    }
}
