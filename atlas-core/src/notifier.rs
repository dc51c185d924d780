use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A button attached to an `Ask`, recognized by callback id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    /// Text shown to the human.
    pub label: String,
    /// Opaque id routed back through [`Notifier`] callbacks, e.g. `approve_<id>`.
    pub callback_id: String,
}

impl Button {
    /// Builds an approve button for the given approval request id.
    #[must_use]
    pub fn approve(request_id: impl std::fmt::Display) -> Self {
        Self {
            label: "Approve".into(),
            callback_id: format!("approve_{request_id}"),
        }
    }

    /// Builds a reject button for the given approval request id.
    #[must_use]
    pub fn reject(request_id: impl std::fmt::Display) -> Self {
        Self {
            label: "Reject".into(),
            callback_id: format!("reject_{request_id}"),
        }
    }
}

/// Outbound human notification channel, kept behind a narrow interface since
/// the concrete transport (chat bot, email, voice) is external.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends an informational message with no expected reply.
    async fn notify(&self, text: &str) -> anyhow::Result<()>;

    /// Sends a message with buttons and awaits a reply (typically the
    /// callback id of whichever button the human pressed).
    async fn ask(&self, text: &str, buttons: &[Button]) -> anyhow::Result<String>;
}

/// Sends `notify` and swallows failures, logging instead of propagating —
/// notifier failures must never surface as task failures.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(err) = notifier.notify(text).await {
        tracing::warn!(error = %err, "notifier failed to deliver message");
    }
}

/// Sends `ask` and swallows failures, returning `None` instead of propagating.
pub async fn ask_best_effort(
    notifier: &dyn Notifier,
    text: &str,
    buttons: &[Button],
) -> Option<String> {
    match notifier.ask(text, buttons).await {
        Ok(reply) => Some(reply),
        Err(err) => {
            tracing::warn!(error = %err, "notifier failed to deliver approval request");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FailingNotifier {
        notify_calls: Mutex<usize>,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _text: &str) -> anyhow::Result<()> {
            *self.notify_calls.lock() += 1;
            anyhow::bail!("transport unavailable")
        }

        async fn ask(&self, _text: &str, _buttons: &[Button]) -> anyhow::Result<String> {
            anyhow::bail!("transport unavailable")
        }
    }

    #[tokio::test]
    async fn notify_best_effort_swallows_errors() {
        let notifier = FailingNotifier::default();
        notify_best_effort(&notifier, "hello").await;
        assert_eq!(*notifier.notify_calls.lock(), 1);
    }

    #[tokio::test]
    async fn ask_best_effort_returns_none_on_failure() {
        let notifier = FailingNotifier::default();
        let reply = ask_best_effort(&notifier, "proceed?", &[Button::approve("req-1")]).await;
        assert!(reply.is_none());
    }

    #[test]
    fn button_callback_ids_match_approval_convention() {
        let approve = Button::approve("req-1");
        let reject = Button::reject("req-1");
        assert_eq!(approve.callback_id, "approve_req-1");
        assert_eq!(reject.callback_id, "reject_req-1");
    }
}
