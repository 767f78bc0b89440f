use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Telegram request error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
