#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

//! Periodic monitor scheduler: each [`MonitorSpec`] owns a single-flight
//! loop that synthesizes a [`atlas_core::Task`] and routes it through a
//! [`atlas_core::Coordinator`] at a fixed interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atlas_core::{Coordinator, RiskLevel, Task, UrgencyLevel};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Declaration of a single periodic check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSpec {
    /// Unique monitor name.
    pub name: String,
    /// Worker the synthesized task should target.
    pub worker: String,
    /// Description used for the synthesized task and for keyword routing.
    pub task_description: String,
    /// Risk level assigned to every tick's synthesized task.
    pub risk: RiskLevel,
    /// Urgency level assigned to every tick's synthesized task.
    pub urgency: UrgencyLevel,
    /// Interval between ticks.
    pub check_interval: Duration,
}

impl MonitorSpec {
    /// Builds a monitor spec targeting an explicit worker.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        worker: impl Into<String>,
        task_description: impl Into<String>,
        risk: RiskLevel,
        urgency: UrgencyLevel,
        check_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            worker: worker.into(),
            task_description: task_description.into(),
            risk,
            urgency,
            check_interval,
        }
    }

    fn synthesize_task(&self) -> Task {
        Task::new(self.task_description.clone(), self.risk, self.urgency)
            .with_target_worker(self.worker.clone())
    }
}

/// Runs a collection of [`MonitorSpec`] loops against a shared coordinator.
///
/// Each spec has its own single-flight guard: a tick that finds the prior
/// tick still in flight is dropped, not queued. A panicking or erroring tick
/// is logged and the loop resumes at the next interval (fail open).
pub struct MonitorScheduler {
    coordinator: Arc<Coordinator>,
    shutdown: CancellationToken,
}

impl MonitorScheduler {
    /// Builds a scheduler bound to a coordinator.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            shutdown: CancellationToken::new(),
        }
    }

    /// A token that, when cancelled, causes every spawned loop to drain.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests graceful shutdown of all running monitor loops.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Spawns a loop for one spec, returning its join handle.
    pub fn spawn(&self, spec: MonitorSpec) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        let shutdown = self.shutdown.clone();
        let in_flight = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(spec.check_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!(monitor = %spec.name, "monitor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        run_tick(&spec, &coordinator, &in_flight).await;
                    }
                }
            }
        })
    }
}

async fn run_tick(spec: &MonitorSpec, coordinator: &Arc<Coordinator>, in_flight: &Arc<AtomicBool>) {
    if in_flight
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        tracing::debug!(monitor = %spec.name, "tick dropped, prior tick still in flight");
        return;
    }

    let task = spec.synthesize_task();
    let coordinator = Arc::clone(coordinator);
    let in_flight = Arc::clone(in_flight);
    let monitor_name = spec.name.clone();

    tokio::spawn(async move {
        let outcome = std::panic::AssertUnwindSafe(coordinator.submit(task))
            .catch_unwind()
            .await;
        match outcome {
            Ok(result) if !result.success => {
                tracing::warn!(monitor = %monitor_name, message = %result.message, "monitor tick reported failure");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::error!(monitor = %monitor_name, "monitor tick panicked");
            }
        }
        in_flight.store(false, Ordering::Release);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::AtlasConfig;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn single_flight_drops_overlapping_ticks() {
        let coordinator = Arc::new(Coordinator::new(AtlasConfig::default()));
        let spec = MonitorSpec::new(
            "disk-check",
            "server_monitor_primary",
            "check disk usage",
            RiskLevel::Low,
            UrgencyLevel::Low,
            Duration::from_millis(5),
        );

        let scheduler = MonitorScheduler::new(coordinator);
        let handle = scheduler.spawn(spec);
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.shutdown();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn shutdown_drains_loop() {
        let coordinator = Arc::new(Coordinator::new(AtlasConfig::default()));
        let spec = MonitorSpec::new(
            "uptime-check",
            "server_monitor_primary",
            "check uptime",
            RiskLevel::Low,
            UrgencyLevel::Low,
            Duration::from_millis(100),
        );
        let scheduler = MonitorScheduler::new(coordinator);
        let handle = scheduler.spawn(spec);
        scheduler.shutdown();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(joined.is_ok());
    }

    #[test]
    fn atomic_in_flight_flag_is_exclusive() {
        let flag = AtomicUsize::new(0);
        flag.fetch_add(1, Ordering::SeqCst);
        assert_eq!(flag.load(Ordering::SeqCst), 1);
    }
}
