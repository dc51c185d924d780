//! Demo `Worker` implementations, one per routing category in
//! `atlas_core::routing`.
//!
//! These exist to give the CLI something to route to out of the box; a
//! real deployment would replace each with an agent backed by live
//! infrastructure (SSH, a mail transport, a model endpoint, ...).

use async_trait::async_trait;
use atlas_core::{Task, TaskResult, Worker};
use atlas_selfcode::{SelfCodePipeline, SelfCodeRequest};

use crate::metrics::MetricStatus;

const SUSPICIOUS_TOKENS: &[&str] = &["drop table", "rm -rf", "; curl", "base64 -d", "nc -e"];

/// Scans a task description for suspicious tokens via pattern-based triage.
#[derive(Debug, Default)]
pub struct SecurityWorker;

#[async_trait]
impl Worker for SecurityWorker {
    fn name(&self) -> &str {
        "security_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        let analysis = self.analyze(&serde_json::json!({ "description": task.description }));
        let hits = analysis["matched_patterns"].as_array().map_or(0, Vec::len);
        if hits > 0 {
            TaskResult::failure(
                format!("{hits} suspicious pattern(s) flagged"),
                "security scan matched a blocked pattern",
            )
            .with_data(analysis)
        } else {
            TaskResult::success("no suspicious patterns found").with_data(analysis)
        }
    }

    fn analyze(&self, data: &serde_json::Value) -> serde_json::Value {
        let description = data["description"].as_str().unwrap_or_default().to_lowercase();
        let matched: Vec<&&str> = SUSPICIOUS_TOKENS
            .iter()
            .filter(|token| description.contains(*token))
            .collect();
        serde_json::json!({ "matched_patterns": matched })
    }
}

/// Host-metric triage: classifies each metric, takes the worst status
/// across them, and maps that to a risk/urgency pair. Reads `cpu`, `ram`
/// and `disk` percentages (0-100) from the task payload; missing fields
/// default to `0.0`.
#[derive(Debug, Default)]
pub struct ServerMonitorWorker;

#[async_trait]
impl Worker for ServerMonitorWorker {
    fn name(&self) -> &str {
        "server_monitor_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        let analysis = self.analyze(&task.payload);
        let status = analysis["status"].as_str().unwrap_or("normal");
        TaskResult::success(format!("host status: {status}")).with_data(analysis)
    }

    fn analyze(&self, data: &serde_json::Value) -> serde_json::Value {
        let cpu = data["cpu"].as_f64().unwrap_or(0.0);
        let ram = data["ram"].as_f64().unwrap_or(0.0);
        let disk = data["disk"].as_f64().unwrap_or(0.0);
        let unreachable = data["unreachable"].as_bool().unwrap_or(false);
        let service_down = data["service_down"].as_bool().unwrap_or(false);

        let worst = MetricStatus::classify(cpu, 70.0, 90.0)
            .worst_of(MetricStatus::classify(ram, 75.0, 90.0))
            .worst_of(MetricStatus::classify(disk, 80.0, 95.0))
            .worst_of(if unreachable || service_down {
                MetricStatus::Critical
            } else {
                MetricStatus::Normal
            });
        let (risk, urgency) = worst.to_risk_urgency(unreachable, service_down);

        serde_json::json!({
            "status": match worst {
                MetricStatus::Normal => "normal",
                MetricStatus::Warning => "warning",
                MetricStatus::Critical => "critical",
            },
            "risk": risk.as_str(),
            "urgency": urgency.as_str(),
            "cpu": cpu,
            "ram": ram,
            "disk": disk,
        })
    }
}

/// Sends (simulated) outbound messages.
#[derive(Debug, Default)]
pub struct CommunicationWorker;

#[async_trait]
impl Worker for CommunicationWorker {
    fn name(&self) -> &str {
        "communication_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        let recipient = task.payload["to"].as_str().unwrap_or("unknown recipient");
        TaskResult::success(format!("message queued for {recipient}"))
    }
}

/// Summarizes a research prompt into a placeholder finding set.
#[derive(Debug, Default)]
pub struct ResearchWorker;

#[async_trait]
impl Worker for ResearchWorker {
    fn name(&self) -> &str {
        "research_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        TaskResult::success(format!("research note drafted: {}", task.description))
    }
}

/// Drafts a placeholder marketing campaign brief.
#[derive(Debug, Default)]
pub struct MarketingWorker;

#[async_trait]
impl Worker for MarketingWorker {
    fn name(&self) -> &str {
        "marketing_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        TaskResult::success(format!("campaign brief drafted: {}", task.description))
    }
}

/// Produces a placeholder trend summary.
#[derive(Debug, Default)]
pub struct AnalysisWorker;

#[async_trait]
impl Worker for AnalysisWorker {
    fn name(&self) -> &str {
        "analysis_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        TaskResult::success(format!("trend summary ready: {}", task.description))
    }
}

/// Produces a placeholder creative draft.
#[derive(Debug, Default)]
pub struct CreativeWorker;

#[async_trait]
impl Worker for CreativeWorker {
    fn name(&self) -> &str {
        "creative_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        TaskResult::success(format!("draft produced: {}", task.description))
    }
}

/// Bridges task routing into the self-coding pipeline.
pub struct CodeMetaWorker {
    pipeline: SelfCodePipeline,
}

impl CodeMetaWorker {
    /// Wraps a configured pipeline for use as a worker.
    #[must_use]
    pub fn new(pipeline: SelfCodePipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Worker for CodeMetaWorker {
    fn name(&self) -> &str {
        "coding_primary"
    }

    async fn run(&self, task: &Task) -> TaskResult {
        let request = SelfCodeRequest::new(task.description.clone())
            .with_require_tests(task.payload["require_tests"].as_bool().unwrap_or(true));
        let result = self.pipeline.run(&request).await;
        let message = if result.success {
            format!(
                "pipeline completed {}/{} stages",
                result.stages_completed.len(),
                result.total_stages
            )
        } else {
            format!("pipeline halted after {} stage(s)", result.stages_completed.len())
        };
        let data = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
        if result.success {
            TaskResult::success(message).with_data(data)
        } else {
            TaskResult::failure(message, result.errors.join("; ")).with_data(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{RiskLevel, UrgencyLevel};
    use atlas_selfcode::{ExecutionConfig, SafeExecutor};

    #[tokio::test]
    async fn security_worker_flags_suspicious_description() {
        let worker = SecurityWorker;
        let task = Task::new("please drop table users", RiskLevel::High, UrgencyLevel::High);
        let result = worker.run(&task).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn security_worker_passes_clean_description() {
        let worker = SecurityWorker;
        let task = Task::new("rotate api keys", RiskLevel::Low, UrgencyLevel::Low);
        let result = worker.run(&task).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn server_monitor_worker_reports_critical_on_high_cpu() {
        let worker = ServerMonitorWorker;
        let task = Task::new("check host", RiskLevel::Low, UrgencyLevel::Low)
            .with_payload(serde_json::json!({ "cpu": 95.0 }));
        let result = worker.run(&task).await;
        assert!(result.success);
        assert_eq!(result.data["status"], "critical");
        assert_eq!(result.data["risk"], "high");
    }

    #[tokio::test]
    async fn coding_worker_bridges_pipeline() {
        let worker = CodeMetaWorker::new(SelfCodePipeline::new(SafeExecutor::new(
            ExecutionConfig::default(),
        )));
        let task = Task::new("add an adder", RiskLevel::Low, UrgencyLevel::Low);
        let result = worker.run(&task).await;
        assert!(result.success);
    }
}
