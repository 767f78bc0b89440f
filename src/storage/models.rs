use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub id: i64,
    pub points: i64,
    pub last_updated: DateTime<Utc>,
    pub group_member: bool,
    pub channel_member: bool,
}

impl UserAccount {
    pub fn is_member(&self, scope: Scope) -> bool {
        match scope {
            Scope::Group => self.group_member,
            Scope::Channel => self.channel_member,
        }
    }
}

/// Which monitored chat a membership flag belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Scope {
    Group,
    Channel,
}

impl Scope {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Scope::Group => "group_member",
            Scope::Channel => "channel_member",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Group => write!(f, "group"),
            Scope::Channel => write!(f, "channel"),
        }
    }
}

/// Whether a deduction may take a balance below zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    #[default]
    AllowNegative,
    FloorAtZero,
}

impl BalancePolicy {
    /// The delta that will actually be applied to `balance`.
    pub fn effective_delta(self, balance: i64, delta: i64) -> i64 {
        match self {
            BalancePolicy::AllowNegative => delta,
            BalancePolicy::FloorAtZero if delta < 0 => delta.max(-balance.max(0)),
            BalancePolicy::FloorAtZero => delta,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PointsStats {
    pub total_users: usize,
    pub total_points: i64,
    pub group_members: usize,
    pub channel_members: usize,
}
