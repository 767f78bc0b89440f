use async_trait::async_trait;
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use teloxide::RequestError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::membership::{adapter, MembershipEvent, TrackedChats};
use crate::supervisor::Worker;
use crate::telegram::commands::IncomingCommand;

/// Splits updates between the command responder and the points ledger.
pub struct UpdateRouter {
    chats: TrackedChats,
    commands: mpsc::Sender<IncomingCommand>,
    events: mpsc::Sender<MembershipEvent>,
}

impl UpdateRouter {
    pub fn new(
        chats: TrackedChats,
        commands: mpsc::Sender<IncomingCommand>,
        events: mpsc::Sender<MembershipEvent>,
    ) -> Self {
        Self {
            chats,
            commands,
            events,
        }
    }

    pub async fn route(&self, update: Update) {
        let update_id = update.id;
        match update.kind {
            UpdateKind::Message(msg) => self.route_message(&msg).await,
            UpdateKind::ChatMember(member) => {
                match adapter::from_member_update(&member, &self.chats) {
                    Some(event) => self.forward_event(event).await,
                    None => debug!(chat_id = member.chat.id.0, "Member update from untracked chat"),
                }
            }
            _ => debug!(update_id, "Ignoring update"),
        }
    }

    async fn route_message(&self, msg: &Message) {
        let artifacts = adapter::from_service_message(msg, &self.chats);
        if !artifacts.is_empty() {
            for event in artifacts {
                self.forward_event(event).await;
            }
            return;
        }

        let Some(text) = msg.text() else {
            return;
        };
        if !text.starts_with('/') {
            return;
        }

        let incoming = IncomingCommand {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            user_id: msg.from().map(|user| user.id.0 as i64),
            text: text.to_string(),
        };
        if self.commands.send(incoming).await.is_err() {
            warn!("Command responder is gone, dropping command");
        }
    }

    async fn forward_event(&self, event: MembershipEvent) {
        if let Err(e) = self.events.send(event).await {
            warn!(event = ?e.0, "Points ledger is gone, dropping event");
        }
    }
}

/// Long-polls `getUpdates`. The offset only moves while routing, so a poll
/// cut short by shutdown loses nothing.
pub struct UpdatePoller {
    bot: Bot,
    offset: i32,
    timeout_secs: u32,
    router: UpdateRouter,
}

impl UpdatePoller {
    pub fn new(bot: Bot, timeout_secs: u32, router: UpdateRouter) -> Self {
        Self {
            bot,
            offset: 0,
            timeout_secs,
            router,
        }
    }
}

#[async_trait]
impl Worker for UpdatePoller {
    type Batch = Vec<Update>;
    type Error = RequestError;

    fn name(&self) -> &'static str {
        "update-poller"
    }

    async fn fetch(&mut self) -> Result<Vec<Update>, RequestError> {
        self.bot
            .get_updates()
            .offset(self.offset)
            .timeout(self.timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::ChatMember])
            .await
    }

    async fn handle(&mut self, updates: Vec<Update>) {
        if !updates.is_empty() {
            debug!(count = updates.len(), offset = self.offset, "Received updates");
        }

        for update in updates {
            self.offset = update.id + 1;
            self.router.route(update).await;
        }
    }

    /// Confirms the routed updates with Telegram; otherwise they are
    /// delivered again on the next start.
    async fn shutdown(&mut self) {
        if self.offset == 0 {
            return;
        }
        match self
            .bot
            .get_updates()
            .offset(self.offset)
            .limit(1)
            .timeout(0)
            .await
        {
            Ok(_) => debug!(offset = self.offset, "Confirmed update offset"),
            Err(e) => warn!(offset = self.offset, error = %e, "Failed to confirm update offset"),
        }
    }
}
