#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

//! Task routing, the decision matrix, the coordinator, escalation and the
//! approval workflow that together form the ATLAS agent orchestration core.

pub mod aggregator;
pub mod approval;
pub mod audit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod escalation;
pub mod matrix;
pub mod notifier;
pub mod routing;
pub mod task;
pub mod worker;

pub use aggregator::{BeliefNetwork, GeometricAggregator, MeanAggregator, UncertaintyAggregator};
pub use approval::{ApprovalOutcome, ApprovalRequest, ApprovalStatus, ApprovalWorkflow};
pub use audit::{AuditEntry, AuditTrail};
pub use config::AtlasConfig;
pub use coordinator::Coordinator;
pub use error::CoreError;
pub use escalation::{EscalationEngine, EscalationLevel, EscalationRecord};
pub use matrix::{DecisionMatrix, Rule, RuleChange};
pub use notifier::{Button, Notifier};
pub use routing::{Router, Selection, SelectionMethod};
pub use task::{ActionType, Decision, RiskLevel, Task, UrgencyLevel};
pub use worker::{TaskResult, Worker, WorkerRegistry};
