use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;

/// Outbound text messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Direct message to a user's private chat.
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<()>;

    /// Reply to a message in any chat.
    async fn reply(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()>;
}

/// Tells users about point changes. Delivery is best effort: a failed send
/// is logged and dropped, never retried.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Returns whether the message was delivered.
    pub async fn notify(&self, user_id: i64, text: &str) -> bool {
        match self.messenger.send_direct(user_id, text).await {
            Ok(()) => {
                info!(user_id, "Message sent successfully");
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to send message to user");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;

    #[tokio::test]
    async fn test_notify_delivers() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_direct()
            .withf(|user_id, text| *user_id == 5 && text.contains("hello"))
            .times(1)
            .returning(|_, _| Ok(()));

        let notifier = Notifier::new(Arc::new(messenger));
        assert!(notifier.notify(5, "hello").await);
    }

    #[tokio::test]
    async fn test_notify_swallows_errors() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_direct()
            .times(1)
            .returning(|_, _| Err(BotError::Config("bot was blocked by the user".to_string())));

        let notifier = Notifier::new(Arc::new(messenger));
        assert!(!notifier.notify(5, "hello").await);
    }
}
