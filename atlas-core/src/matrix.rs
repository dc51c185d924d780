use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::aggregator::{posterior_maxima, BeliefNetwork, MeanAggregator, UncertaintyAggregator};
use crate::task::{ActionType, Decision, RiskLevel, Task, UrgencyLevel};

/// One matrix cell: the action and base confidence for a `(risk, urgency)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rule {
    /// Action prescribed by this cell.
    pub action: ActionType,
    /// Base confidence before gating, in `[0, 1]`.
    pub base_confidence: f64,
}

impl Rule {
    fn new(action: ActionType, base_confidence: f64) -> Self {
        Self {
            action,
            base_confidence: base_confidence.clamp(0.0, 1.0),
        }
    }
}

/// Record of a single rule mutation; never deleted, even across `reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleChange {
    /// Risk axis of the changed cell.
    pub risk: RiskLevel,
    /// Urgency axis of the changed cell.
    pub urgency: UrgencyLevel,
    /// Action before the change.
    pub old_action: ActionType,
    /// Confidence before the change.
    pub old_confidence: f64,
    /// Action after the change.
    pub new_action: ActionType,
    /// Confidence after the change.
    pub new_confidence: f64,
    /// Identity of whoever requested the change.
    pub actor: String,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
}

fn default_table() -> [[Rule; 3]; 3] {
    use ActionType::{AutoFix, Immediate, Log, Notify};
    [
        [Rule::new(Log, 0.95), Rule::new(Log, 0.90), Rule::new(Notify, 0.85)],
        [Rule::new(Notify, 0.85), Rule::new(Notify, 0.80), Rule::new(AutoFix, 0.75)],
        [Rule::new(Notify, 0.80), Rule::new(AutoFix, 0.70), Rule::new(Immediate, 0.90)],
    ]
}

fn axis_index(risk: RiskLevel) -> usize {
    match risk {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
    }
}

fn urgency_index(urgency: UrgencyLevel) -> usize {
    match urgency {
        UrgencyLevel::Low => 0,
        UrgencyLevel::Medium => 1,
        UrgencyLevel::High => 2,
    }
}

/// Fallback rule used when a cell is missing from the table.
const FALLBACK: Rule = Rule {
    action: ActionType::Notify,
    base_confidence: 0.5,
};

struct MatrixState {
    table: [[Rule; 3]; 3],
    history: Vec<RuleChange>,
}

/// `(risk, urgency) -> (action, confidence)` table with confidence gating,
/// runtime rule updates, and a tamper-evident change log.
pub struct DecisionMatrix {
    state: Mutex<MatrixState>,
    aggregator: Box<dyn UncertaintyAggregator>,
    belief_network: Option<Box<dyn BeliefNetwork>>,
    threshold: f64,
    risk_tolerance: f64,
}

impl DecisionMatrix {
    /// Builds a matrix with the default table and the mean aggregator.
    #[must_use]
    pub fn new(threshold: f64, risk_tolerance: f64) -> Self {
        Self {
            state: Mutex::new(MatrixState {
                table: default_table(),
                history: Vec::new(),
            }),
            aggregator: Box::new(MeanAggregator),
            belief_network: None,
            threshold,
            risk_tolerance,
        }
    }

    /// Substitutes the uncertainty aggregator.
    #[must_use]
    pub fn with_aggregator(mut self, aggregator: Box<dyn UncertaintyAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Registers a belief network used when a task carries `evidence`.
    #[must_use]
    pub fn with_belief_network(mut self, network: Box<dyn BeliefNetwork>) -> Self {
        self.belief_network = Some(network);
        self
    }

    fn risk_weight(risk: RiskLevel) -> f64 {
        risk.weight()
    }

    fn gate_pass(&self, aggregated: f64, risk_weight: f64) -> bool {
        let required =
            (self.threshold + (risk_weight - self.risk_tolerance) * (1.0 - self.threshold))
                .clamp(0.0, 1.0);
        aggregated >= required
    }

    /// Evaluates a task, applying belief and evidence gating where applicable.
    pub fn evaluate(&self, task: &Task) -> Decision {
        let rule = {
            let state = self.state.lock();
            state
                .table
                .get(axis_index(task.risk))
                .and_then(|row| row.get(urgency_index(task.urgency)))
                .copied()
                .unwrap_or(FALLBACK)
        };

        let mut action = rule.action;
        let mut confidence = rule.base_confidence;
        let mut reason = format!(
            "matrix({},{}) -> ({}, {:.2})",
            task.risk.as_str(),
            task.urgency.as_str(),
            rule.action.as_str(),
            rule.base_confidence
        );

        let risk_weight = Self::risk_weight(task.risk);

        if !task.beliefs.is_empty() {
            let confidences: Vec<f64> = task.beliefs.values().copied().collect();
            let aggregated = self.aggregator.aggregate(&confidences);
            let permitted = self.gate_pass(aggregated, risk_weight);
            reason.push_str(&format!(
                "; beliefs aggregated={aggregated:.2} gate_pass={permitted}"
            ));
            if !permitted && matches!(action, ActionType::AutoFix | ActionType::Immediate) {
                action = ActionType::Notify;
                confidence *= aggregated;
                reason.push_str(&format!(
                    "; downgraded to notify, confidence={confidence:.2}"
                ));
            }
        }

        if !task.evidence.is_empty() {
            if let Some(network) = &self.belief_network {
                let maxima = posterior_maxima(network.as_ref(), &task.evidence);
                let aggregated = self.aggregator.aggregate(&maxima);
                let permitted = self.gate_pass(aggregated, risk_weight);
                reason.push_str(&format!(
                    "; evidence aggregated={aggregated:.2} gate_pass={permitted}"
                ));
                if permitted {
                    action = rule.action;
                } else if matches!(rule.action, ActionType::AutoFix | ActionType::Immediate) {
                    action = ActionType::Notify;
                    confidence = rule.base_confidence * aggregated;
                } else {
                    action = rule.action;
                    confidence = rule.base_confidence * aggregated;
                }
            }
        }

        Decision {
            risk: task.risk,
            urgency: task.urgency,
            action,
            confidence: confidence.clamp(0.0, 1.0),
            reason,
        }
    }

    /// Mutates a single cell, recording a [`RuleChange`].
    pub fn update_rule(
        &self,
        risk: RiskLevel,
        urgency: UrgencyLevel,
        new_action: ActionType,
        new_confidence: f64,
        actor: impl Into<String>,
    ) -> RuleChange {
        let mut state = self.state.lock();
        let ri = axis_index(risk);
        let ui = urgency_index(urgency);
        let old = state.table[ri][ui];
        let new_confidence = new_confidence.clamp(0.0, 1.0);
        state.table[ri][ui] = Rule::new(new_action, new_confidence);
        let change = RuleChange {
            risk,
            urgency,
            old_action: old.action,
            old_confidence: old.base_confidence,
            new_action,
            new_confidence,
            actor: actor.into(),
            timestamp: Utc::now(),
        };
        state.history.push(change.clone());
        change
    }

    /// Restores the built-in default table; the change log is untouched.
    pub fn reset_rules(&self) {
        let mut state = self.state.lock();
        state.table = default_table();
    }

    /// Full rule-change history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<RuleChange> {
        self.state.lock().history.clone()
    }

    /// Produces a multi-line human-readable trace for a previously computed decision.
    #[must_use]
    pub fn explain_decision(&self, decision: &Decision) -> String {
        format!(
            "risk={}\nurgency={}\naction={}\nconfidence={:.2}\nreason={}",
            decision.risk.as_str(),
            decision.urgency.as_str(),
            decision.action.as_str(),
            decision.confidence,
            decision.reason
        )
    }
}

impl Default for DecisionMatrix {
    fn default() -> Self {
        Self::new(0.6, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn default_table_high_risk_high_urgency_is_immediate() {
        let matrix = DecisionMatrix::default();
        let task = Task::new("t", RiskLevel::High, UrgencyLevel::High);
        let decision = matrix.evaluate(&task);
        assert_eq!(decision.action, ActionType::Immediate);
        assert!((decision.confidence - 0.90).abs() < 1e-9);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let matrix = DecisionMatrix::default();
        let task = Task::new("t", RiskLevel::Medium, UrgencyLevel::High);
        let first = matrix.evaluate(&task);
        let second = matrix.evaluate(&task);
        assert_eq!(first.action, second.action);
        assert!((first.confidence - second.confidence).abs() < f64::EPSILON);
    }

    #[test]
    fn belief_gate_downgrades_high_risk_immediate() {
        let matrix = DecisionMatrix::default();
        let task = Task::new("wipe partition", RiskLevel::High, UrgencyLevel::High)
            .with_belief("disk_is_dead", 0.4);
        let decision = matrix.evaluate(&task);
        assert_eq!(decision.action, ActionType::Notify);
        assert!((decision.confidence - 0.36).abs() < 1e-9);
    }

    #[test]
    fn update_rule_records_change_and_reset_restores_defaults() {
        let matrix = DecisionMatrix::default();
        let change = matrix.update_rule(
            RiskLevel::Low,
            UrgencyLevel::Low,
            ActionType::Notify,
            0.5,
            "operator",
        );
        assert_eq!(change.old_action, ActionType::Log);
        assert!((change.old_confidence - 0.95).abs() < 1e-9);

        let task = Task::new("t", RiskLevel::Low, UrgencyLevel::Low);
        assert_eq!(matrix.evaluate(&task).action, ActionType::Notify);

        matrix.reset_rules();
        assert_eq!(matrix.evaluate(&task).action, ActionType::Log);
        assert_eq!(matrix.history().len(), 1);
    }

    #[test]
    fn confidence_clamped_on_update() {
        let matrix = DecisionMatrix::default();
        let change = matrix.update_rule(
            RiskLevel::Low,
            UrgencyLevel::Low,
            ActionType::Log,
            1.5,
            "operator",
        );
        assert!((change.new_confidence - 1.0).abs() < f64::EPSILON);
    }
}
