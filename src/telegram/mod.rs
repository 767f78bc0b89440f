pub mod bot;
pub mod commands;
pub mod formatters;
pub mod gateway;
pub mod invite;
pub mod notifications;
pub mod poller;

pub use bot::run_telegram_bot;
pub use notifications::{Messenger, Notifier};
