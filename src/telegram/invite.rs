use async_trait::async_trait;
use tracing::error;

use crate::error::Result;
use crate::telegram::formatters::INVITE_LINK_FALLBACK;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InviteLinkSource: Send + Sync {
    async fn create_invite_link(&self, chat_id: i64) -> Result<String>;
}

/// Invite link for `chat_id`, or the fallback text when the API refuses.
pub async fn invite_link_or_fallback(source: &dyn InviteLinkSource, chat_id: i64) -> String {
    match source.create_invite_link(chat_id).await {
        Ok(link) => link,
        Err(e) => {
            error!(chat_id, error = %e, "Error creating invite link");
            INVITE_LINK_FALLBACK.to_string()
        }
    }
}
