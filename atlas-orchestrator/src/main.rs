//! ATLAS command-line entry point: submits tasks through the coordinator,
//! resolves pending approvals, and can run the demo monitor loops.

mod metrics;
mod notifier;
mod workers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use atlas_core::{AtlasConfig, Coordinator, RiskLevel, Task, UrgencyLevel};
use atlas_eventbus::FileEventPublisher;
use atlas_logging::{JsonLogger, LogLevel};
use atlas_monitor::{MonitorScheduler, MonitorSpec};
use atlas_selfcode::{ExecutionConfig, SafeExecutor, SelfCodePipeline};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::notifier::ConsoleNotifier;
use crate::workers::{
    AnalysisWorker, CodeMetaWorker, CommunicationWorker, CreativeWorker, MarketingWorker,
    ResearchWorker, SecurityWorker, ServerMonitorWorker,
};

#[derive(Parser, Debug)]
#[command(name = "atlas", version, about = "ATLAS task coordination CLI")]
struct Cli {
    /// Directory event and audit logs are written under.
    #[arg(long, default_value = "logs/atlas")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submits a task through the full decision pipeline and prints the result.
    Submit {
        /// Free-text task description, used for keyword routing.
        description: String,
        /// `low`, `medium` or `high`.
        #[arg(long, default_value = "low")]
        risk: String,
        /// `low`, `medium` or `high`.
        #[arg(long, default_value = "low")]
        urgency: String,
        /// Skip routing and target this worker explicitly.
        #[arg(long)]
        worker: Option<String>,
        /// JSON payload handed to the resolved worker.
        #[arg(long)]
        payload: Option<String>,
    },
    /// Approves a pending `immediate`-class action by request id.
    Approve {
        /// Approval request id printed by a prior `submit`.
        request_id: Uuid,
    },
    /// Rejects a pending `immediate`-class action by request id.
    Reject {
        /// Approval request id printed by a prior `submit`.
        request_id: Uuid,
    },
    /// Lists requests still awaiting a human decision.
    Status,
    /// Runs the demo server-monitor loop until interrupted.
    Serve {
        /// Seconds between monitor ticks.
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let coordinator = Arc::new(build_coordinator(&cli.log_dir)?);

    match cli.command {
        Commands::Submit {
            description,
            risk,
            urgency,
            worker,
            payload,
        } => handle_submit(&coordinator, description, &risk, &urgency, worker, payload).await,
        Commands::Approve { request_id } => handle_response(&coordinator, request_id, true),
        Commands::Reject { request_id } => handle_response(&coordinator, request_id, false),
        Commands::Status => {
            let pending = coordinator.approvals().pending_snapshot();
            println!("{}", serde_json::to_string_pretty(&pending)?);
            Ok(())
        }
        Commands::Serve { interval_secs } => run_serve(coordinator, interval_secs).await,
    }
}

fn build_coordinator(log_dir: &PathBuf) -> Result<Coordinator> {
    std::fs::create_dir_all(log_dir).context("creating log directory")?;
    let logger = JsonLogger::new(log_dir.join("atlas.log.jsonl"))?;
    logger.emit("atlas-orchestrator", LogLevel::Info, "coordinator bootstrapping", serde_json::json!({}))?;

    let events = Arc::new(FileEventPublisher::new(log_dir.join("events.log.jsonl"))?);
    let coordinator = Coordinator::new(AtlasConfig::default())
        .with_notifier(Arc::new(ConsoleNotifier))
        .with_event_publisher(events);

    let registry = coordinator.registry();
    registry.register(Arc::new(SecurityWorker));
    registry.register(Arc::new(ServerMonitorWorker));
    registry.register(Arc::new(CommunicationWorker));
    registry.register(Arc::new(ResearchWorker));
    registry.register(Arc::new(MarketingWorker));
    registry.register(Arc::new(AnalysisWorker));
    registry.register(Arc::new(CreativeWorker));
    registry.register(Arc::new(CodeMetaWorker::new(SelfCodePipeline::new(
        SafeExecutor::new(ExecutionConfig::default()),
    ))));

    Ok(coordinator)
}

async fn handle_submit(
    coordinator: &Arc<Coordinator>,
    description: String,
    risk: &str,
    urgency: &str,
    worker: Option<String>,
    payload: Option<String>,
) -> Result<()> {
    let mut task = Task::from_raw(description, risk, urgency).map_err(|err| anyhow::anyhow!(err))?;
    if let Some(worker) = worker {
        task = task.with_target_worker(worker);
    }
    if let Some(payload) = payload {
        let value: serde_json::Value =
            serde_json::from_str(&payload).context("parsing --payload as JSON")?;
        task = task.with_payload(value);
    }

    let result = coordinator.submit(task).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        let pending = coordinator.approvals().pending_snapshot();
        if let Some(request) = pending.last() {
            println!("pending approval request id: {}", request.id);
        }
    }
    Ok(())
}

fn handle_response(coordinator: &Arc<Coordinator>, request_id: Uuid, approved: bool) -> Result<()> {
    match coordinator.approvals().handle_response(request_id, approved) {
        Some(outcome) => {
            println!("{:?}", outcome.request.status);
            Ok(())
        }
        None => anyhow::bail!("no pending request with id {request_id}"),
    }
}

async fn run_serve(coordinator: Arc<Coordinator>, interval_secs: u64) -> Result<()> {
    let scheduler = MonitorScheduler::new(Arc::clone(&coordinator));
    let spec = MonitorSpec::new(
        "demo-host-check",
        "server_monitor_primary",
        "scheduled host metric check",
        RiskLevel::Low,
        UrgencyLevel::Low,
        Duration::from_secs(interval_secs),
    );
    let handle = scheduler.spawn(spec);

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    scheduler.shutdown();
    let _ = handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_low_risk_task_logs_through() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Arc::new(build_coordinator(&dir.path().to_path_buf()).unwrap());
        let task = Task::new("daily report", RiskLevel::Low, UrgencyLevel::Low);
        let result = coordinator.submit(task).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn submit_routes_to_server_monitor_by_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Arc::new(build_coordinator(&dir.path().to_path_buf()).unwrap());
        let task = Task::new("restart nginx on server", RiskLevel::Medium, UrgencyLevel::High);
        let result = coordinator.submit(task).await;
        assert!(result.success);
    }
}
