// subject_write.rs — What a subject may change on records it owns.
//
// A subject's snapshot is untrusted even for its own records. Against the
// persisted request it may:
//   - take the two subject edges (upload a receipt, submit the profile)
//   - append messages it sent, and mark the authority's messages read
//   - append progress samples
// Everything else is the authority's. An incoming status that lies behind
// the persisted one is a stale copy: its authority-owned fields are ignored
// and the persisted values kept. Programs are never written by a subject.

use coach_policy::SubjectWritable;

use crate::profile::{Message, ProgressSample};
use crate::program::Program;
use crate::request::{EngagementRequest, RequestStatus};

fn is_subject_edge(from: RequestStatus, to: RequestStatus) -> bool {
    matches!(
        (from, to),
        (RequestStatus::ApprovedWaitingPayment, RequestStatus::PaymentUploaded)
            | (RequestStatus::PaymentApproved, RequestStatus::WaitingForPlan)
    )
}

impl SubjectWritable for EngagementRequest {
    fn check_subject_create(&self) -> Result<(), String> {
        if self.status != RequestStatus::Pending {
            return Err(format!(
                "new request must be {}, got {}",
                RequestStatus::Pending,
                self.status
            ));
        }
        if self.price.is_some() || self.payment_account.is_some() || self.receipt_ref.is_some() {
            return Err("new request carries payment fields".to_string());
        }
        if self.biometric_profile.is_some() {
            return Err("new request carries a biometric profile".to_string());
        }
        if let Some(message) = self.messages.iter().find(|m| m.sender_id != self.subject_id) {
            return Err(format!("message {} was not sent by the owner", message.id));
        }
        check_samples(&self.progress_log)
    }

    fn apply_subject_write(&self, incoming: Self) -> Result<Self, String> {
        if incoming.details != self.details {
            return Err("request details changed".to_string());
        }
        if incoming.created_at != self.created_at {
            return Err("createdAt changed".to_string());
        }

        let mut next = self.clone();
        if incoming.status == self.status || is_subject_edge(self.status, incoming.status) {
            if incoming.price != self.price || incoming.payment_account != self.payment_account {
                return Err("payment fields changed".to_string());
            }
            apply_status(&mut next, &incoming)?;
        } else if !incoming.status.reaches(&self.status) {
            return Err(format!(
                "{} → {} is not a subject transition",
                self.status, incoming.status
            ));
        }

        next.messages = merge_messages(&self.messages, incoming.messages, &self.subject_id)?;
        next.progress_log = merge_progress(&self.progress_log, incoming.progress_log)?;
        Ok(next)
    }
}

/// Status plus the field each subject edge carries. Off an edge, the
/// receipt and profile must match what is persisted.
fn apply_status(next: &mut EngagementRequest, incoming: &EngagementRequest) -> Result<(), String> {
    match (next.status, incoming.status) {
        (RequestStatus::ApprovedWaitingPayment, RequestStatus::PaymentUploaded) => {
            if incoming.biometric_profile != next.biometric_profile {
                return Err("biometric profile changed".to_string());
            }
            match &incoming.receipt_ref {
                Some(receipt) if !receipt.trim().is_empty() => {
                    next.receipt_ref = Some(receipt.clone());
                }
                _ => return Err("receipt upload without a receipt".to_string()),
            }
        }
        (RequestStatus::PaymentApproved, RequestStatus::WaitingForPlan) => {
            if incoming.receipt_ref != next.receipt_ref {
                return Err("receipt changed".to_string());
            }
            let profile = incoming
                .biometric_profile
                .as_ref()
                .ok_or_else(|| "profile submission without a profile".to_string())?;
            profile.validate().map_err(|e| e.to_string())?;
            next.biometric_profile = Some(profile.clone());
        }
        _ => {
            if incoming.receipt_ref != next.receipt_ref {
                return Err("receipt changed".to_string());
            }
            if incoming.biometric_profile != next.biometric_profile {
                return Err("biometric profile changed".to_string());
            }
        }
    }
    next.status = incoming.status;
    Ok(())
}

/// Keep every persisted message. Known ids may only gain a read mark on
/// messages the owner received; unknown ids must be sent by the owner.
fn merge_messages(
    persisted: &[Message],
    incoming: Vec<Message>,
    owner: &str,
) -> Result<Vec<Message>, String> {
    let mut merged = persisted.to_vec();
    for message in incoming {
        match merged.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                if existing.sender_id != message.sender_id
                    || existing.text != message.text
                    || existing.timestamp != message.timestamp
                {
                    return Err(format!("message {} rewritten", message.id));
                }
                if message.is_read && existing.sender_id != owner {
                    existing.is_read = true;
                }
            }
            None => {
                if message.sender_id != owner {
                    return Err(format!("message {} was not sent by the owner", message.id));
                }
                merged.push(Message {
                    is_read: false,
                    ..message
                });
            }
        }
    }
    Ok(merged)
}

/// The log only grows. A shorter prefix is a stale copy and changes nothing.
fn merge_progress(
    persisted: &[ProgressSample],
    incoming: Vec<ProgressSample>,
) -> Result<Vec<ProgressSample>, String> {
    if incoming.starts_with(persisted) {
        check_samples(&incoming[persisted.len()..])?;
        return Ok(incoming);
    }
    if persisted.starts_with(&incoming) {
        return Ok(persisted.to_vec());
    }
    Err("progress log rewritten".to_string())
}

fn check_samples(samples: &[ProgressSample]) -> Result<(), String> {
    match samples
        .iter()
        .find(|s| !(s.weight.is_finite() && s.weight > 0.0))
    {
        Some(sample) => Err(format!("progress weight must be positive, got {}", sample.weight)),
        None => Ok(()),
    }
}

impl SubjectWritable for Program {
    fn check_subject_create(&self) -> Result<(), String> {
        Err("programs are published by the authority".to_string())
    }

    fn apply_subject_write(&self, incoming: Self) -> Result<Self, String> {
        if incoming != *self {
            return Err("programs are read-only for subjects".to_string());
        }
        Ok(incoming)
    }
}
