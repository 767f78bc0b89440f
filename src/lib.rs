pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod membership;
pub mod storage;
pub mod supervisor;
pub mod telegram;
pub mod utils;

pub use config::Config;
pub use context::AppContext;
pub use error::{BotError, Result};
