use crate::storage::Scope;

/// A configured chat, by numeric id or by public username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Numeric strings become ids; anything else is a username (a leading
    /// `@` is dropped).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => ChatRef::Id(id),
            Err(_) => ChatRef::Username(raw.trim_start_matches('@').to_string()),
        }
    }

    pub fn matches(&self, chat_id: i64, username: Option<&str>) -> bool {
        match self {
            ChatRef::Id(id) => *id == chat_id,
            ChatRef::Username(name) => username.is_some_and(|u| u.eq_ignore_ascii_case(name)),
        }
    }
}

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => write!(f, "@{}", name),
        }
    }
}

/// A member's standing in a chat, reduced from the transport's member kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Creator,
    Administrator,
    Member,
    Restricted { is_member: bool },
    Left,
    Banned,
}

impl Standing {
    pub fn is_present(self) -> bool {
        match self {
            Standing::Creator | Standing::Administrator | Standing::Member => true,
            Standing::Restricted { is_member } => is_member,
            Standing::Left | Standing::Banned => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Creator,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The user joined on their own.
    Joined { role: Role },
    /// Someone else added the user (or approved a join request).
    Added { role: Role },
    /// The user left on their own.
    Left,
    /// Someone else removed or banned the user.
    Kicked,
    /// Service message echoing a membership change already delivered as a
    /// member update.
    DeleteArtifact,
    /// Promotions, restrictions and anything else that is not a join or leave.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEvent {
    pub scope: Scope,
    pub user_id: i64,
    pub kind: EventKind,
}

/// Derives the event kind from a member's standing before and after a change.
pub fn classify(actor_id: i64, user_id: i64, old: Standing, new: Standing) -> EventKind {
    let role = if new == Standing::Creator {
        Role::Creator
    } else {
        Role::Regular
    };

    match (old.is_present(), new.is_present()) {
        (false, true) if actor_id == user_id => EventKind::Joined { role },
        (false, true) => EventKind::Added { role },
        (true, false) if new == Standing::Banned => EventKind::Kicked,
        (true, false) if actor_id == user_id => EventKind::Left,
        (true, false) => EventKind::Kicked,
        _ => EventKind::Other,
    }
}
