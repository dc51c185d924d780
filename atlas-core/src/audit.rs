use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::routing::SelectionMethod;
use crate::task::{ActionType, Decision, RiskLevel, UrgencyLevel};

/// One record per decision taken. Append-only; outcome is filled in after
/// routing completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Free-text task description at the time of evaluation.
    pub task_description: String,
    /// Risk axis.
    pub risk: RiskLevel,
    /// Urgency axis.
    pub urgency: UrgencyLevel,
    /// Action actually executed, post-escalation and post-gating.
    pub final_action: ActionType,
    /// Confidence actually used to execute.
    pub final_confidence: f64,
    /// Trace of how the decision was reached.
    pub reason: String,
    /// Worker selected, if any.
    pub selected_worker: Option<String>,
    /// How the worker was selected.
    pub selection_method: SelectionMethod,
    /// Action this entry was escalated from, if any.
    pub escalated_from: Option<ActionType>,
    /// Filled once routing completes.
    pub outcome_success: Option<bool>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds an entry from a task description and its decision, prior to
    /// routing having run.
    #[must_use]
    pub fn new(
        task_description: impl Into<String>,
        decision: &Decision,
        selected_worker: Option<String>,
        selection_method: SelectionMethod,
        escalated_from: Option<ActionType>,
    ) -> Self {
        Self {
            task_description: task_description.into(),
            risk: decision.risk,
            urgency: decision.urgency,
            final_action: decision.action,
            final_confidence: decision.confidence,
            reason: decision.reason.clone(),
            selected_worker,
            selection_method,
            escalated_from,
            outcome_success: None,
            created_at: Utc::now(),
        }
    }
}

/// Append-only, bounded queue of [`AuditEntry`] records; oldest dropped on overflow.
pub struct AuditTrail {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditTrail {
    /// Creates a trail bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    /// Appends an entry, returning its index within the current queue.
    pub fn append(&self, entry: AuditEntry) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        entries.len() - 1
    }

    /// Sets the outcome on the most recently appended entry.
    pub fn set_last_outcome(&self, success: bool) {
        let mut entries = self.entries.lock();
        if let Some(last) = entries.back_mut() {
            last.outcome_success = Some(success);
        }
    }

    /// Updates the most recently appended entry's action/confidence/reason
    /// and escalation origin, used when escalation changes the executed action.
    pub fn overwrite_last_action(
        &self,
        new_action: ActionType,
        new_confidence: f64,
        reason: impl Into<String>,
        escalated_from: ActionType,
    ) {
        let mut entries = self.entries.lock();
        if let Some(last) = entries.back_mut() {
            last.escalated_from = Some(escalated_from);
            last.final_action = new_action;
            last.final_confidence = new_confidence;
            last.reason = reason.into();
        }
    }

    /// Snapshot of all retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the trail currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ActionType, Decision, RiskLevel, UrgencyLevel};

    fn sample_decision() -> Decision {
        Decision {
            risk: RiskLevel::Low,
            urgency: UrgencyLevel::Low,
            action: ActionType::Log,
            confidence: 0.95,
            reason: "matrix default".into(),
        }
    }

    #[test]
    fn append_and_set_outcome() {
        let trail = AuditTrail::new(10);
        trail.append(AuditEntry::new(
            "daily report",
            &sample_decision(),
            None,
            SelectionMethod::None,
            None,
        ));
        trail.set_last_outcome(true);
        let snapshot = trail.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].outcome_success, Some(true));
    }

    #[test]
    fn bounded_capacity_drops_oldest() {
        let trail = AuditTrail::new(2);
        for i in 0..5 {
            trail.append(AuditEntry::new(
                format!("task-{i}"),
                &sample_decision(),
                None,
                SelectionMethod::None,
                None,
            ));
        }
        let snapshot = trail.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].task_description, "task-3");
        assert_eq!(snapshot[1].task_description, "task-4");
    }
}
