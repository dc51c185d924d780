use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::task::{ActionType, Decision, Task};

/// Lifecycle state of an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a human response or timeout.
    Pending,
    /// Approved, either by callback or timeout auto-execution.
    Approved,
    /// Rejected by callback.
    Rejected,
    /// Timed out with no auto-execution.
    TimedOut,
}

/// A pending human-in-the-loop approval for an `immediate`-class action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// The task awaiting approval.
    pub task: Task,
    /// The action that would execute if approved.
    pub proposed_action: ActionType,
    /// The decision that produced `proposed_action`.
    pub decision: Decision,
    /// Seconds before the request times out.
    pub timeout_seconds: u64,
    /// Whether expiry should be treated as an approval.
    pub auto_execute_on_timeout: bool,
    /// Current lifecycle state.
    pub status: ApprovalStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When a terminal response was recorded, if any.
    pub responded_at: Option<DateTime<Utc>>,
}

/// Outcome of resolving an [`ApprovalRequest`], either by callback or timeout.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    /// The request as it stood at resolution.
    pub request: ApprovalRequest,
    /// Whether the caller should now execute `proposed_action`.
    pub should_execute: bool,
}

struct PendingEntry {
    request: ApprovalRequest,
    cancel: oneshot::Sender<()>,
}

/// Pending-approval map with atomic approve/reject/timeout transitions.
///
/// All state transitions are serialized through the single map lock so a
/// racing timeout and a human reply cannot both trigger execution.
#[derive(Default)]
pub struct ApprovalWorkflow {
    pending: Mutex<HashMap<Uuid, PendingEntry>>,
}

impl ApprovalWorkflow {
    /// Creates an empty workflow.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new approval request and arms its timeout timer.
    ///
    /// Returns the request id and a receiver that resolves with the terminal
    /// [`ApprovalOutcome`] once the request leaves `pending` state, whether
    /// via [`Self::handle_response`] or via the timer armed here.
    pub fn request_approval(
        self: &Arc<Self>,
        task: Task,
        proposed_action: ActionType,
        decision: Decision,
        timeout_seconds: u64,
        auto_execute_on_timeout: bool,
    ) -> (Uuid, oneshot::Receiver<ApprovalOutcome>) {
        let id = Uuid::new_v4();
        let request = ApprovalRequest {
            id,
            task,
            proposed_action,
            decision,
            timeout_seconds,
            auto_execute_on_timeout,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock();
            pending.insert(
                id,
                PendingEntry {
                    request: request.clone(),
                    cancel: cancel_tx,
                },
            );
        }

        let workflow = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(timeout_seconds)) => {
                    if let Some(outcome) = workflow.resolve_timeout(id) {
                        let _ = outcome_tx.send(outcome);
                    }
                }
                _ = cancel_rx => {}
            }
        });

        (id, outcome_rx)
    }

    /// Handles an approve/reject callback, atomically removing the request
    /// from the pending map. Re-responding to an unknown or already-terminal
    /// id returns `None`.
    pub fn handle_response(&self, id: Uuid, approved: bool) -> Option<ApprovalOutcome> {
        let mut pending = self.pending.lock();
        let entry = pending.remove(&id)?;
        let mut request = entry.request;
        let _ = entry.cancel.send(());
        request.responded_at = Some(Utc::now());
        request.status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        Some(ApprovalOutcome {
            should_execute: approved,
            request,
        })
    }

    /// Resolves a request whose timer fired before any callback arrived.
    /// Returns `None` if the request already left the pending map.
    pub fn resolve_timeout(&self, id: Uuid) -> Option<ApprovalOutcome> {
        let mut pending = self.pending.lock();
        let entry = pending.remove(&id)?;
        let mut request = entry.request;
        request.responded_at = Some(Utc::now());
        if request.auto_execute_on_timeout {
            request.status = ApprovalStatus::Approved;
            Some(ApprovalOutcome {
                should_execute: true,
                request,
            })
        } else {
            request.status = ApprovalStatus::TimedOut;
            Some(ApprovalOutcome {
                should_execute: false,
                request,
            })
        }
    }

    /// Snapshot of all requests still pending.
    #[must_use]
    pub fn pending_snapshot(&self) -> Vec<ApprovalRequest> {
        self.pending
            .lock()
            .values()
            .map(|entry| entry.request.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RiskLevel, UrgencyLevel};

    fn sample_decision() -> Decision {
        Decision {
            risk: RiskLevel::High,
            urgency: UrgencyLevel::High,
            action: ActionType::Immediate,
            confidence: 0.9,
            reason: "test".into(),
        }
    }

    #[tokio::test]
    async fn approve_transitions_and_removes_from_pending() {
        let workflow = Arc::new(ApprovalWorkflow::new());
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High);
        let (id, _rx) =
            workflow.request_approval(task, ActionType::Immediate, sample_decision(), 60, false);
        assert_eq!(workflow.pending_snapshot().len(), 1);

        let outcome = workflow.handle_response(id, true).expect("outcome");
        assert_eq!(outcome.request.status, ApprovalStatus::Approved);
        assert!(outcome.should_execute);
        assert!(workflow.pending_snapshot().is_empty());
    }

    #[tokio::test]
    async fn reject_is_idempotent() {
        let workflow = Arc::new(ApprovalWorkflow::new());
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High);
        let (id, _rx) =
            workflow.request_approval(task, ActionType::Immediate, sample_decision(), 60, false);
        let first = workflow.handle_response(id, false);
        assert!(first.is_some());
        let second = workflow.handle_response(id, false);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn timeout_without_auto_execute_marks_timed_out() {
        let workflow = Arc::new(ApprovalWorkflow::new());
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High);
        let (id, _rx) =
            workflow.request_approval(task, ActionType::Immediate, sample_decision(), 1, false);
        let outcome = workflow.resolve_timeout(id).expect("outcome");
        assert_eq!(outcome.request.status, ApprovalStatus::TimedOut);
        assert!(!outcome.should_execute);
    }

    #[tokio::test]
    async fn timeout_with_auto_execute_marks_approved() {
        let workflow = Arc::new(ApprovalWorkflow::new());
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High);
        let (id, _rx) =
            workflow.request_approval(task, ActionType::Immediate, sample_decision(), 1, true);
        let outcome = workflow.resolve_timeout(id).expect("outcome");
        assert_eq!(outcome.request.status, ApprovalStatus::Approved);
        assert!(outcome.should_execute);
    }
}
