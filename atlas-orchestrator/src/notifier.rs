//! Console `Notifier`, standing in for the chat/email transports a real
//! deployment would drive notifications over.

use async_trait::async_trait;
use atlas_core::{Button, Notifier};

/// Prints notifications to stdout and auto-approves every `ask`.
///
/// A terminal has no human sitting at a callback queue, so `ask` resolves
/// immediately with the first button's callback id rather than blocking
/// forever; a real deployment swaps this for a chat-bot transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, text: &str) -> anyhow::Result<()> {
        println!("[notify] {text}");
        Ok(())
    }

    async fn ask(&self, text: &str, buttons: &[Button]) -> anyhow::Result<String> {
        println!("[ask] {text}");
        for button in buttons {
            println!("  - {} ({})", button.label, button.callback_id);
        }
        let Some(first) = buttons.first() else {
            anyhow::bail!("ask called with no buttons");
        };
        println!("[ask] auto-selecting '{}'", first.label);
        Ok(first.callback_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ask_auto_selects_first_button() {
        let notifier = ConsoleNotifier;
        let buttons = [Button::approve("req-1"), Button::reject("req-1")];
        let reply = notifier.ask("proceed?", &buttons).await.unwrap();
        assert_eq!(reply, "approve_req-1");
    }

    #[tokio::test]
    async fn ask_with_no_buttons_errors() {
        let notifier = ConsoleNotifier;
        assert!(notifier.ask("proceed?", &[]).await.is_err());
    }
}
