use serde::Deserialize;
use std::time::Duration;

use crate::membership::ChatRef;
use crate::storage::BalancePolicy;
use crate::supervisor::BackoffPolicy;

/// Process configuration, read from the environment (and an optional
/// `config/default` file layered underneath).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
    /// Channel username (used in the `t.me` link) or numeric chat id.
    pub channel_id: String,
    pub group_id: i64,

    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_join_reward")]
    pub join_reward: i64,
    #[serde(default)]
    pub balance_policy: BalancePolicy,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,

    #[serde(default = "default_transient_delay_secs")]
    pub transient_delay_secs: u64,
    #[serde(default = "default_other_delay_secs")]
    pub other_delay_secs: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_circuit_cooldown_secs")]
    pub circuit_cooldown_secs: u64,
}

fn default_database_path() -> String {
    "user_data.db".to_string()
}

fn default_join_reward() -> i64 {
    100
}

fn default_poll_timeout_secs() -> u32 {
    60
}

fn default_transient_delay_secs() -> u64 {
    15
}

fn default_other_delay_secs() -> u64 {
    30
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_secs() -> u64 {
    300
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_circuit_cooldown_secs() -> u64 {
    600
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Self::from_environment(config::Environment::default())
    }

    /// Builds the config from the given environment source. Split out of
    /// [`Config::load`] so tests can feed a fixed variable map.
    pub fn from_environment(env: config::Environment) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(env)
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN must not be empty");
        }
        if self.api_hash.trim().is_empty() {
            anyhow::bail!("API_HASH must not be empty");
        }
        if self.channel_id.trim().is_empty() {
            anyhow::bail!("CHANNEL_ID must not be empty");
        }
        if self.join_reward <= 0 {
            anyhow::bail!("JOIN_REWARD must be positive, got {}", self.join_reward);
        }
        if self.backoff_multiplier < 1.0 {
            anyhow::bail!("BACKOFF_MULTIPLIER must be at least 1.0");
        }
        Ok(())
    }

    pub fn channel(&self) -> ChatRef {
        ChatRef::parse(&self.channel_id)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            transient_delay: Duration::from_secs(self.transient_delay_secs),
            other_delay: Duration::from_secs(self.other_delay_secs),
            multiplier: self.backoff_multiplier,
            max_delay: Duration::from_secs(self.max_delay_secs),
            max_consecutive_failures: self.max_consecutive_failures,
            circuit_cooldown: Duration::from_secs(self.circuit_cooldown_secs),
        }
    }
}
