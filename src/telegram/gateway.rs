use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::error::Result;
use crate::telegram::invite::InviteLinkSource;
use crate::telegram::notifications::Messenger;

/// Bot API implementation of the outbound traits.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramGateway {
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<()> {
        // A user's private chat shares the user's id.
        self.bot.send_message(ChatId(user_id), text).await?;
        Ok(())
    }

    async fn reply(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_to_message_id(MessageId(message_id))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl InviteLinkSource for TelegramGateway {
    async fn create_invite_link(&self, chat_id: i64) -> Result<String> {
        let link = self.bot.create_chat_invite_link(ChatId(chat_id)).await?;
        Ok(link.invite_link)
    }
}
