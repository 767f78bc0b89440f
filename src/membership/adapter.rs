//! Conversion from Bot API update shapes into [`MembershipEvent`]s.
//!
//! This is the only place that looks at teloxide's member types; the ledger
//! works on the closed event type alone.

use teloxide::types::{Chat, ChatMemberKind, ChatMemberUpdated, Message};

use crate::config::Config;
use crate::membership::event::{classify, ChatRef, EventKind, MembershipEvent, Standing};
use crate::storage::Scope;

/// The group and channel whose membership earns points.
#[derive(Debug, Clone)]
pub struct TrackedChats {
    pub group_id: i64,
    pub channel: ChatRef,
}

impl TrackedChats {
    pub fn from_config(config: &Config) -> Self {
        Self {
            group_id: config.group_id,
            channel: config.channel(),
        }
    }

    pub fn scope_for(&self, chat_id: i64, username: Option<&str>) -> Option<Scope> {
        if chat_id == self.group_id {
            Some(Scope::Group)
        } else if self.channel.matches(chat_id, username) {
            Some(Scope::Channel)
        } else {
            None
        }
    }

    fn scope_of(&self, chat: &Chat) -> Option<Scope> {
        self.scope_for(chat.id.0, chat.username())
    }
}

pub fn standing(kind: &ChatMemberKind) -> Standing {
    match kind {
        ChatMemberKind::Owner(_) => Standing::Creator,
        ChatMemberKind::Administrator(_) => Standing::Administrator,
        ChatMemberKind::Member => Standing::Member,
        ChatMemberKind::Restricted(restricted) => Standing::Restricted {
            is_member: restricted.is_member,
        },
        ChatMemberKind::Left => Standing::Left,
        ChatMemberKind::Banned(_) => Standing::Banned,
    }
}

/// Returns `None` for chats that are not tracked.
pub fn from_member_update(
    update: &ChatMemberUpdated,
    chats: &TrackedChats,
) -> Option<MembershipEvent> {
    let scope = chats.scope_of(&update.chat)?;
    let user_id = update.new_chat_member.user.id.0 as i64;
    let kind = classify(
        update.from.id.0 as i64,
        user_id,
        standing(&update.old_chat_member.kind),
        standing(&update.new_chat_member.kind),
    );

    Some(MembershipEvent {
        scope,
        user_id,
        kind,
    })
}

/// Join/leave service messages in tracked chats. They duplicate the member
/// updates, so they are surfaced as [`EventKind::DeleteArtifact`].
pub fn from_service_message(msg: &Message, chats: &TrackedChats) -> Vec<MembershipEvent> {
    let Some(scope) = chats.scope_of(&msg.chat) else {
        return Vec::new();
    };

    let artifact = |user_id: u64| MembershipEvent {
        scope,
        user_id: user_id as i64,
        kind: EventKind::DeleteArtifact,
    };

    if let Some(users) = msg.new_chat_members() {
        users.iter().map(|user| artifact(user.id.0)).collect()
    } else if let Some(user) = msg.left_chat_member() {
        vec![artifact(user.id.0)]
    } else {
        Vec::new()
    }
}
