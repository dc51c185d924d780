use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::worker::WorkerRegistry;

/// How a worker ended up selected for a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// `task.target_worker` named a registered worker.
    Explicit,
    /// Keyword scoring picked a category with a matching registered worker.
    Keyword,
    /// Nothing matched.
    None,
}

/// Outcome of [`Router::select`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// Chosen worker name, if any.
    pub worker: Option<String>,
    /// How it was chosen.
    pub method: SelectionMethod,
}

/// Declaration order matters: category score ties are broken by the order
/// categories appear here.
static CATEGORIES: Lazy<Vec<(&'static str, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (
            "security",
            &[
                "security", "breach", "intrusion", "vulnerability", "firewall", "exploit",
            ],
        ),
        (
            "server_monitor",
            &["server", "cpu", "memory", "disk", "uptime", "restart", "nginx"],
        ),
        (
            "communication",
            &["email", "message", "chat", "notify", "reply", "inbox"],
        ),
        (
            "research",
            &["research", "investigate", "study", "survey", "literature"],
        ),
        (
            "marketing",
            &["campaign", "marketing", "audience", "ad", "promotion"],
        ),
        (
            "coding",
            &["code", "bug", "refactor", "function", "compile", "test"],
        ),
        (
            "analysis",
            &["analyze", "analysis", "metrics", "report", "trend"],
        ),
        (
            "creative",
            &["design", "creative", "draft", "story", "art"],
        ),
    ]
});

/// Selects a worker for a task from an explicit target or keyword scoring.
///
/// Purely a function of the task and a registry snapshot; performs no
/// side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct Router;

impl Router {
    /// Creates a router. Stateless; exists for symmetry with other components.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Selects a worker for `task` given the current `registry` contents.
    #[must_use]
    pub fn select(&self, task: &Task, registry: &WorkerRegistry) -> Selection {
        if let Some(target) = &task.target_worker {
            if registry.get(target).is_some() {
                return Selection {
                    worker: Some(target.clone()),
                    method: SelectionMethod::Explicit,
                };
            }
        }

        let tokens = tokenize(&task.description);
        self.select_by_keyword(&tokens, registry, &[])
    }

    /// Keyword selection excluding the given worker names, used by the
    /// escalation engine when searching for an alternate worker.
    #[must_use]
    pub fn select_excluding(
        &self,
        task: &Task,
        registry: &WorkerRegistry,
        exclude: &[String],
    ) -> Selection {
        let tokens = tokenize(&task.description);
        self.select_by_keyword(&tokens, registry, exclude)
    }

    fn select_by_keyword(
        &self,
        tokens: &[String],
        registry: &WorkerRegistry,
        exclude: &[String],
    ) -> Selection {
        let mut scores: IndexMap<&'static str, usize> = IndexMap::new();
        for (category, keywords) in CATEGORIES.iter() {
            let score = keywords
                .iter()
                .filter(|kw| tokens.iter().any(|t| t == *kw))
                .count();
            scores.insert(category, score);
        }

        let mut best: Option<(&'static str, usize)> = None;
        for (category, score) in &scores {
            if *score == 0 {
                continue;
            }
            let candidate = registry
                .names_tagged(category)
                .into_iter()
                .find(|name| !exclude.contains(name));
            if candidate.is_none() {
                continue;
            }
            match best {
                Some((_, best_score)) if *score <= best_score => {}
                _ => best = Some((category, *score)),
            }
        }

        match best {
            Some((category, _)) => {
                let worker = registry
                    .names_tagged(category)
                    .into_iter()
                    .find(|name| !exclude.contains(name));
                Selection {
                    worker,
                    method: SelectionMethod::Keyword,
                }
            }
            None => Selection {
                worker: None,
                method: SelectionMethod::None,
            },
        }
    }
}

fn tokenize(description: &str) -> Vec<String> {
    description
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RiskLevel, Task, UrgencyLevel};
    use crate::worker::{TaskResult, Worker, WorkerRegistry};
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
    fn explicit_target_wins() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(StubWorker("server_monitor_primary")));
        let task = Task::new("restart nginx", RiskLevel::Medium, UrgencyLevel::High)
            .with_target_worker("server_monitor_primary");
        let selection = Router::new().select(&task, &registry);
        assert_eq!(selection.method, SelectionMethod::Explicit);
        assert_eq!(selection.worker.as_deref(), Some("server_monitor_primary"));
    }

    #[test]
    fn keyword_routes_to_registered_category() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(StubWorker("server_monitor_primary")));
        let task = Task::new("server cpu memory disk spike", RiskLevel::Medium, UrgencyLevel::High);
        let selection = Router::new().select(&task, &registry);
        assert_eq!(selection.method, SelectionMethod::Keyword);
        assert_eq!(selection.worker.as_deref(), Some("server_monitor_primary"));
    }

    #[test]
    fn no_match_selects_none() {
        let registry = WorkerRegistry::new();
        let task = Task::new("xyzzy plugh", RiskLevel::Low, UrgencyLevel::Low);
        let selection = Router::new().select(&task, &registry);
        assert_eq!(selection.method, SelectionMethod::None);
        assert!(selection.worker.is_none());
    }

    #[test]
    fn explicit_target_not_registered_falls_back_to_keyword() {
        let registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(StubWorker("coding_helper")));
        let task = Task::new("fix the bug in this function", RiskLevel::Low, UrgencyLevel::Low)
            .with_target_worker("nonexistent");
        let selection = Router::new().select(&task, &registry);
        assert_eq!(selection.method, SelectionMethod::Keyword);
        assert_eq!(selection.worker.as_deref(), Some("coding_helper"));
    }
}
