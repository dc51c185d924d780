use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Risk classification of a task, as judged by its originator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk of harm if acted on incorrectly.
    Low,
    /// Moderate risk.
    Medium,
    /// High risk; mistakes are costly or hard to reverse.
    High,
}

impl RiskLevel {
    /// Parses a risk string, raising a [`CoreError::Validation`] for anything unrecognized.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!("unknown risk level: {other}"))),
        }
    }

    /// The `risk_weight` used by the confidence gate.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.9,
        }
    }

    /// Canonical lowercase string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Urgency classification of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    /// Can wait.
    Low,
    /// Should be handled soon.
    Medium,
    /// Needs attention now.
    High,
}

impl UrgencyLevel {
    /// Parses an urgency string, raising a [`CoreError::Validation`] for anything unrecognized.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!(
                "unknown urgency level: {other}"
            ))),
        }
    }

    /// Canonical lowercase string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// The action a [`crate::matrix::DecisionMatrix`] can prescribe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Record the event only.
    Log,
    /// Notify a human, no autonomous change.
    Notify,
    /// Apply an autonomous fix.
    AutoFix,
    /// Act immediately, with post-hoc human confirmation.
    Immediate,
}

impl ActionType {
    /// Canonical lowercase string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Notify => "notify",
            Self::AutoFix => "auto_fix",
            Self::Immediate => "immediate",
        }
    }
}

/// A unit of work accepted by the coordinator.
///
/// Immutable once accepted. The `payload` field is
/// the single opaque boundary value worker implementations decode
/// themselves, per the typed-task-envelope design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: Uuid,
    /// Free text used by keyword routing and worker reports.
    pub description: String,
    /// Risk classification.
    pub risk: RiskLevel,
    /// Urgency classification.
    pub urgency: UrgencyLevel,
    /// Explicit worker override; when present, routing must not be overridden.
    pub target_worker: Option<String>,
    /// Belief name -> confidence in `[0, 1]`.
    pub beliefs: IndexMap<String, f64>,
    /// Opaque tokens passed to the uncertainty aggregator's belief network.
    pub evidence: Vec<String>,
    /// Worker-specific payload.
    pub payload: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds a task directly from already-validated typed fields.
    #[must_use]
    pub fn new(description: impl Into<String>, risk: RiskLevel, urgency: UrgencyLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            risk,
            urgency,
            target_worker: None,
            beliefs: IndexMap::new(),
            evidence: Vec::new(),
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Parses raw risk/urgency strings as an inbound transport would.
    ///
    /// This is the validation boundary: malformed risk/urgency never reaches
    /// [`crate::matrix::DecisionMatrix::evaluate`].
    pub fn from_raw(
        description: impl Into<String>,
        risk: &str,
        urgency: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(
            description,
            RiskLevel::parse(risk)?,
            UrgencyLevel::parse(urgency)?,
        ))
    }

    /// Sets an explicit target worker.
    #[must_use]
    pub fn with_target_worker(mut self, worker: impl Into<String>) -> Self {
        self.target_worker = Some(worker.into());
        self
    }

    /// Adds a belief confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_belief(mut self, name: impl Into<String>, confidence: f64) -> Self {
        self.beliefs.insert(name.into(), confidence.clamp(0.0, 1.0));
        self
    }

    /// Adds an evidence token.
    #[must_use]
    pub fn with_evidence(mut self, token: impl Into<String>) -> Self {
        self.evidence.push(token.into());
        self
    }

    /// Sets the worker-specific payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// The verdict produced by evaluating a [`Task`] against the decision matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Risk carried over from the task.
    pub risk: RiskLevel,
    /// Urgency carried over from the task.
    pub urgency: UrgencyLevel,
    /// Chosen action.
    pub action: ActionType,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable trace of how the decision was reached.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(RiskLevel::parse("high").unwrap(), RiskLevel::High);
        assert_eq!(UrgencyLevel::parse("low").unwrap(), UrgencyLevel::Low);
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(RiskLevel::parse("critical").is_err());
        assert!(Task::from_raw("test", "critical", "low").is_err());
    }

    #[test]
    fn belief_confidence_is_clamped() {
        let task = Task::new("t", RiskLevel::Low, UrgencyLevel::Low).with_belief("x", 1.5);
        assert!((task.beliefs["x"] - 1.0).abs() < f64::EPSILON);
    }
}
