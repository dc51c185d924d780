use std::collections::BTreeMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Outcome of a [`Worker::run`] invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the worker considers the task handled.
    pub success: bool,
    /// Human-readable status line.
    pub message: String,
    /// Free-form result payload, including an `"analysis"` key populated from
    /// [`Worker::analyze`] when `run` calls it.
    pub data: serde_json::Value,
    /// Diagnostic errors; non-empty only when `success` is `false`.
    pub errors: Vec<String>,
}

impl TaskResult {
    /// Builds a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: serde_json::Value::Null,
            errors: Vec::new(),
        }
    }

    /// Builds a failed result carrying one diagnostic error.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: serde_json::Value::Null,
            errors: vec![error.into()],
        }
    }

    /// Attaches a result payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Uniform contract honored by every ATLAS worker.
///
/// Implementations must not panic on malformed input; a bad payload maps to
/// a failed [`TaskResult`] with a populated `errors` entry, never a panic.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable, unique worker name used by routing and the registry.
    fn name(&self) -> &str;

    /// Performs the task, typically calling [`Worker::analyze`] internally
    /// and folding its output into `TaskResult.data["analysis"]`.
    async fn run(&self, task: &Task) -> TaskResult;

    /// Classifies raw result data into risk/urgency/action/summary fields.
    fn analyze(&self, data: &serde_json::Value) -> serde_json::Value {
        let _ = data;
        serde_json::Value::Null
    }

    /// Renders a human-readable report for the notifier.
    fn report(&self, result: &TaskResult) -> String {
        if result.success {
            format!("OK: {}", result.message)
        } else {
            format!("FAILED: {} ({})", result.message, result.errors.join("; "))
        }
    }
}

/// Name-keyed registry of live workers.
///
/// Re-registering an existing name replaces the prior entry (and logs a
/// warning at the call site) without disturbing calls already in flight,
/// since each lookup clones an `Arc` before the call.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: RwLock<IndexMap<String, std::sync::Arc<dyn Worker>>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker, replacing any prior worker with the same name.
    pub fn register(&self, worker: std::sync::Arc<dyn Worker>) -> bool {
        let mut workers = self.workers.write();
        let replaced = workers.insert(worker.name().to_string(), worker).is_some();
        replaced
    }

    /// Removes a worker by name, returning whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.workers.write().shift_remove(name).is_some()
    }

    /// Looks up a worker by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Worker>> {
        self.workers.read().get(name).cloned()
    }

    /// Lists registered worker names in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.workers.read().keys().cloned().collect()
    }

    /// Names of workers whose own name contains the given category tag,
    /// preserving registration order — used by the routing engine.
    #[must_use]
    pub fn names_tagged(&self, category: &str) -> Vec<String> {
        self.workers
            .read()
            .keys()
            .filter(|name| name.contains(category))
            .cloned()
            .collect()
    }

    /// Snapshot of name -> worker pairs, stable ordering.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, std::sync::Arc<dyn Worker>> {
        self.workers
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RiskLevel, UrgencyLevel};

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, task: &Task) -> TaskResult {
            TaskResult::success(format!("echoed: {}", task.description))
        }
    }

    #[tokio::test]
    async fn registers_and_runs() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(EchoWorker));
        let worker = registry.get("echo").expect("worker present");
        let task = Task::new("hello", RiskLevel::Low, UrgencyLevel::Low);
        let result = worker.run(&task).await;
        assert!(result.success);
        assert_eq!(result.message, "echoed: hello");
    }

    #[test]
    fn reregistering_replaces_without_duplicate_entries() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(EchoWorker));
        let replaced = registry.register(std::sync::Arc::new(EchoWorker));
        assert!(replaced);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn unregister_reports_presence() {
        let registry = WorkerRegistry::new();
        assert!(!registry.unregister("missing"));
        registry.register(std::sync::Arc::new(EchoWorker));
        assert!(registry.unregister("echo"));
        assert!(registry.get("echo").is_none());
    }
}
