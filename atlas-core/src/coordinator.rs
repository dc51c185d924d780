use std::sync::Arc;

use atlas_eventbus::{EventPublisher, EventRecord};

use crate::approval::ApprovalWorkflow;
use crate::audit::{AuditEntry, AuditTrail};
use crate::config::AtlasConfig;
use crate::escalation::EscalationEngine;
use crate::matrix::DecisionMatrix;
use crate::notifier::{ask_best_effort, notify_best_effort, Button, Notifier};
use crate::routing::{Router, SelectionMethod};
use crate::task::{ActionType, Task};
use crate::worker::{TaskResult, WorkerRegistry};

/// Orchestrates the full per-task pipeline: evaluate, route, execute,
/// escalate on failure, and record the audit trail.
///
/// Re-entrant: concurrent calls operate on independent tasks, contending
/// only for the locks each collaborator already guards internally (registry,
/// matrix, audit queue, pending approvals).
pub struct Coordinator {
    registry: Arc<WorkerRegistry>,
    router: Router,
    matrix: Arc<DecisionMatrix>,
    audit: Arc<AuditTrail>,
    escalation: EscalationEngine,
    approvals: Arc<ApprovalWorkflow>,
    notifier: Option<Arc<dyn Notifier>>,
    events: Option<Arc<dyn EventPublisher>>,
    config: AtlasConfig,
    escalation_enabled: bool,
}

impl Coordinator {
    /// Builds a coordinator from its collaborators and configuration.
    #[must_use]
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            registry: Arc::new(WorkerRegistry::new()),
            router: Router::new(),
            matrix: Arc::new(DecisionMatrix::new(
                config.confidence_threshold,
                config.risk_tolerance,
            )),
            audit: Arc::new(AuditTrail::new(config.max_audit_history)),
            escalation: EscalationEngine::new(),
            approvals: Arc::new(ApprovalWorkflow::new()),
            notifier: None,
            events: None,
            escalation_enabled: true,
            config,
        }
    }

    /// Attaches an outbound notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Attaches an event publisher used to stream audit and escalation events.
    #[must_use]
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Disables escalation, useful for tests that want to observe raw failures.
    #[must_use]
    pub fn with_escalation_enabled(mut self, enabled: bool) -> Self {
        self.escalation_enabled = enabled;
        self
    }

    /// Worker registry, shared with callers that need to register workers
    /// or monitors that need to resolve one directly.
    #[must_use]
    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Decision matrix, exposed for rule administration.
    #[must_use]
    pub fn matrix(&self) -> &Arc<DecisionMatrix> {
        &self.matrix
    }

    /// Audit trail, exposed for read access.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    /// Approval workflow, exposed so an HTTP/CLI layer can deliver callbacks.
    #[must_use]
    pub fn approvals(&self) -> &Arc<ApprovalWorkflow> {
        &self.approvals
    }

    /// Runs the full pipeline for one task.
    pub async fn submit(&self, task: Task) -> TaskResult {
        let decision = self.matrix.evaluate(&task);
        let selection = self.router.select(&task, &self.registry);

        let entry = AuditEntry::new(
            task.description.clone(),
            &decision,
            selection.worker.clone(),
            selection.method,
            None,
        );
        self.audit.append(entry);
        self.publish_audit_event(&task, &decision, selection.method, selection.worker.as_deref())
            .await;

        let mut result = self
            .route_action(&task, decision.action, decision.confidence, selection.worker.clone())
            .await;

        self.audit.set_last_outcome(result.success);

        if !result.success
            && self.escalation_enabled
            && matches!(decision.action, ActionType::AutoFix | ActionType::Immediate)
        {
            let record = self.escalation.escalate(
                &task,
                decision.action,
                selection.worker.as_deref(),
                result.message.clone(),
                &self.registry,
            );

            self.audit.overwrite_last_action(
                record.new_action,
                decision.confidence,
                format!("escalated via {:?}: {}", record.level, record.reason),
                decision.action,
            );

            result = self
                .route_action(&task, record.new_action, decision.confidence, record.new_worker)
                .await;
            self.audit.set_last_outcome(result.success);
        }

        result
    }

    async fn route_action(
        &self,
        task: &Task,
        action: ActionType,
        confidence: f64,
        worker_name: Option<String>,
    ) -> TaskResult {
        match action {
            ActionType::Log => TaskResult::success("logged"),
            ActionType::Notify => {
                if let Some(notifier) = &self.notifier {
                    let text = format!(
                        "[{}] {} (confidence {:.2})",
                        action.as_str(),
                        task.description,
                        confidence
                    );
                    notify_best_effort(notifier.as_ref(), &text).await;
                }
                TaskResult::success("notified")
            }
            ActionType::AutoFix => {
                let worker_name = worker_name.or_else(|| self.router.select(task, &self.registry).worker);
                self.dispatch(task, worker_name).await
            }
            ActionType::Immediate => self.route_immediate(task, confidence, worker_name).await,
        }
    }

    async fn route_immediate(
        &self,
        task: &Task,
        confidence: f64,
        worker_name: Option<String>,
    ) -> TaskResult {
        let decision_snapshot = crate::task::Decision {
            risk: task.risk,
            urgency: task.urgency,
            action: ActionType::Immediate,
            confidence,
            reason: "immediate action pending approval".into(),
        };

        let (request_id, _outcome_rx) = self.approvals.request_approval(
            task.clone(),
            ActionType::Immediate,
            decision_snapshot,
            self.config.approval_default_timeout,
            false,
        );

        if let Some(notifier) = &self.notifier {
            let buttons = [Button::approve(request_id), Button::reject(request_id)];
            let text = format!("Approve immediate action: {}?", task.description);
            let _ = ask_best_effort(notifier.as_ref(), &text, &buttons).await;
        }

        self.dispatch(task, worker_name).await
    }

    async fn dispatch(&self, task: &Task, worker_name: Option<String>) -> TaskResult {
        let Some(worker_name) = worker_name else {
            let target = task.target_worker.clone().unwrap_or_default();
            return TaskResult::failure(
                format!("no worker available for '{target}'"),
                format!("no worker resolved for task targeting '{target}'"),
            );
        };

        let Some(worker) = self.registry.get(&worker_name) else {
            return TaskResult::failure(
                format!("no worker available for '{worker_name}'"),
                format!("worker '{worker_name}' not found in registry"),
            );
        };

        worker.run(task).await
    }

    async fn publish_audit_event(
        &self,
        task: &Task,
        decision: &crate::task::Decision,
        method: SelectionMethod,
        worker: Option<&str>,
    ) {
        let Some(events) = &self.events else {
            return;
        };
        let record = EventRecord {
            id: uuid::Uuid::new_v4().to_string(),
            source: "atlas-core".into(),
            event_type: "audit.decision.recorded".into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload: serde_json::json!({
                "task": task.description,
                "action": decision.action.as_str(),
                "confidence": decision.confidence,
                "method": format!("{method:?}"),
                "worker": worker,
            }),
        };
        if let Err(err) = events.publish(record).await {
            tracing::warn!(error = %err, "failed to publish audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RiskLevel, UrgencyLevel};
    use async_trait::async_trait;

    struct AlwaysSucceeds;

    #[async_trait]
    impl crate::worker::Worker for AlwaysSucceeds {
        fn name(&self) -> &str {
            "server_monitor_primary"
        }
        async fn run(&self, _task: &Task) -> TaskResult {
            TaskResult::success("restarted")
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl crate::worker::Worker for AlwaysFails {
        fn name(&self) -> &str {
            "server_monitor_primary"
        }
        async fn run(&self, _task: &Task) -> TaskResult {
            TaskResult::failure("failed", "ssh timeout")
        }
    }

    #[tokio::test]
    async fn s1_low_risk_log_through() {
        let coordinator = Coordinator::new(AtlasConfig::default());
        let task = Task::new("daily report", RiskLevel::Low, UrgencyLevel::Low);
        let result = coordinator.submit(task).await;
        assert!(result.success);
        assert_eq!(result.message, "logged");
        assert_eq!(coordinator.audit().len(), 1);
    }

    #[tokio::test]
    async fn s2_medium_risk_auto_fix_with_explicit_target() {
        let coordinator = Coordinator::new(AtlasConfig::default());
        coordinator
            .registry()
            .register(Arc::new(AlwaysSucceeds));
        let task = Task::new("restart nginx", RiskLevel::Medium, UrgencyLevel::High)
            .with_target_worker("server_monitor_primary");
        let result = coordinator.submit(task).await;
        assert!(result.success);
        assert_eq!(result.message, "restarted");
    }

    #[tokio::test]
    async fn s3_auto_fix_failure_escalates_to_immediate() {
        let coordinator = Coordinator::new(AtlasConfig::default());
        coordinator.registry().register(Arc::new(AlwaysFails));
        let task = Task::new("restart nginx", RiskLevel::Medium, UrgencyLevel::High)
            .with_target_worker("server_monitor_primary");
        let result = coordinator.submit(task).await;
        assert!(!result.success);
        let audit = coordinator.audit().snapshot();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].escalated_from, Some(ActionType::AutoFix));
        assert_eq!(audit[0].final_action, ActionType::Immediate);
    }

    #[tokio::test]
    async fn s4_belief_gate_downgrades_immediate() {
        let coordinator = Coordinator::new(AtlasConfig::default());
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High)
            .with_belief("disk_is_dead", 0.4);
        let result = coordinator.submit(task).await;
        assert!(result.success);
        assert_eq!(result.message, "notified");
        let audit = coordinator.audit().snapshot();
        assert_eq!(audit[0].final_action, ActionType::Notify);
    }

    #[tokio::test]
    async fn explicit_target_missing_worker_fails_with_name_in_message() {
        let coordinator = Coordinator::new(AtlasConfig::default());
        let task = Task::new("restart nginx", RiskLevel::Medium, UrgencyLevel::High)
            .with_target_worker("x");
        let result = coordinator.submit(task).await;
        assert!(!result.success);
        assert!(result.message.contains('x'));
    }
}
