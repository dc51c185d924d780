use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routing::Router;
use crate::task::{ActionType, Task};
use crate::worker::WorkerRegistry;

/// Which rung of the escalation ladder was applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// A failed `auto_fix` was promoted to `immediate`.
    PromoteAction,
    /// A failed `immediate` was re-dispatched to a different worker.
    AlternateWorker,
    /// Neither applies; degraded to `notify`.
    NotifyHuman,
}

/// Record of a single escalation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    /// Action in effect before escalation.
    pub original_action: ActionType,
    /// Worker that failed, if any.
    pub original_worker: Option<String>,
    /// Diagnostic string describing the failure.
    pub reason: String,
    /// Rung applied.
    pub level: EscalationLevel,
    /// Action chosen after escalation.
    pub new_action: ActionType,
    /// Worker chosen after escalation, if any.
    pub new_worker: Option<String>,
    /// When the escalation was applied.
    pub timestamp: DateTime<Utc>,
}

/// Re-dispatches a failed worker invocation exactly one step up the ladder.
///
/// Never recurses: the coordinator applies this once per task, even if the
/// escalated attempt also fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalationEngine;

impl EscalationEngine {
    /// Creates an escalation engine. Stateless.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decides the next action and worker for a failed invocation.
    #[must_use]
    pub fn escalate(
        &self,
        task: &Task,
        failed_action: ActionType,
        failed_worker: Option<&str>,
        error_message: impl Into<String>,
        registry: &WorkerRegistry,
    ) -> EscalationRecord {
        let reason = error_message.into();

        match failed_action {
            ActionType::AutoFix => EscalationRecord {
                original_action: failed_action,
                original_worker: failed_worker.map(str::to_string),
                reason,
                level: EscalationLevel::PromoteAction,
                new_action: ActionType::Immediate,
                new_worker: failed_worker.map(str::to_string),
                timestamp: Utc::now(),
            },
            ActionType::Immediate => {
                let exclude = failed_worker.map(str::to_string).into_iter().collect::<Vec<_>>();
                let selection = Router::new().select_excluding(task, registry, &exclude);
                match selection.worker {
                    Some(alternate) => EscalationRecord {
                        original_action: failed_action,
                        original_worker: failed_worker.map(str::to_string),
                        reason,
                        level: EscalationLevel::AlternateWorker,
                        new_action: failed_action,
                        new_worker: Some(alternate),
                        timestamp: Utc::now(),
                    },
                    None => EscalationRecord {
                        original_action: failed_action,
                        original_worker: failed_worker.map(str::to_string),
                        reason,
                        level: EscalationLevel::NotifyHuman,
                        new_action: ActionType::Notify,
                        new_worker: None,
                        timestamp: Utc::now(),
                    },
                }
            }
            _ => EscalationRecord {
                original_action: failed_action,
                original_worker: failed_worker.map(str::to_string),
                reason,
                level: EscalationLevel::NotifyHuman,
                new_action: ActionType::Notify,
                new_worker: None,
                timestamp: Utc::now(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RiskLevel, UrgencyLevel};
    use crate::worker::{TaskResult, Worker};
    use async_trait::async_trait;

    struct StubWorker(&'static str);

    #[async_trait]
    impl Worker for StubWorker {
        fn name(&self) -> &str {
            self.0
        }
        async fn run(&self, _task: &Task) -> TaskResult {
            TaskResult::success("stub")
        }
    }

    #[test]
    fn auto_fix_promotes_to_immediate() {
        let registry = WorkerRegistry::new();
        let task = Task::new("restart nginx", RiskLevel::Medium, UrgencyLevel::High);
        let record = EscalationEngine::new().escalate(
            &task,
            ActionType::AutoFix,
            Some("server_monitor_primary"),
            "ssh timeout",
            &registry,
        );
        assert_eq!(record.level, EscalationLevel::PromoteAction);
        assert_eq!(record.new_action, ActionType::Immediate);
    }

    #[test]
    fn immediate_failure_finds_alternate_worker() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(StubWorker("server_monitor_primary")));
        registry.register(std::sync::Arc::new(StubWorker("server_monitor_backup")));
        let task = Task::new("restart nginx server", RiskLevel::High, UrgencyLevel::High);
        let record = EscalationEngine::new().escalate(
            &task,
            ActionType::Immediate,
            Some("server_monitor_primary"),
            "connection refused",
            &registry,
        );
        assert_eq!(record.level, EscalationLevel::AlternateWorker);
        assert_eq!(record.new_worker.as_deref(), Some("server_monitor_backup"));
    }

    #[test]
    fn immediate_failure_without_alternate_degrades_to_notify() {
        let registry = WorkerRegistry::new();
        let task = Task::new("restart nginx server", RiskLevel::High, UrgencyLevel::High);
        let record = EscalationEngine::new().escalate(
            &task,
            ActionType::Immediate,
            Some("server_monitor_primary"),
            "connection refused",
            &registry,
        );
        assert_eq!(record.level, EscalationLevel::NotifyHuman);
        assert_eq!(record.new_action, ActionType::Notify);
    }
}
