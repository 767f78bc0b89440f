use std::sync::Arc;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::context::AppContext;
use crate::telegram::formatters;
use crate::telegram::invite::invite_link_or_fallback;

/// Supported chat commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Tasks,
    Points,
    /// `/task_<suffix>`; the suffix is validated when answering.
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    NotACommand,
    UnknownCommand(String),
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACommand => write!(f, "message is not a command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{}`", cmd),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// The fixed commands, as registered in the Telegram "/" menu.
#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum MenuCommand {
    #[command(description = "Start interaction with the bot")]
    Start,
    #[command(description = "Show help message")]
    Help,
    #[command(description = "List available tasks")]
    Tasks,
    #[command(rename = "task_1", description = "Join our GambieGroup")]
    Task1,
    #[command(rename = "task_2", description = "Join our Bonus Collectors channel")]
    Task2,
    #[command(description = "Show your points balance")]
    Points,
}

impl From<MenuCommand> for Command {
    fn from(command: MenuCommand) -> Self {
        match command {
            MenuCommand::Start => Command::Start,
            MenuCommand::Help => Command::Help,
            MenuCommand::Tasks => Command::Tasks,
            MenuCommand::Task1 => Command::Task("1".to_string()),
            MenuCommand::Task2 => Command::Task("2".to_string()),
            MenuCommand::Points => Command::Points,
        }
    }
}

/// Parses the leading command token. Arguments are ignored and an `@bot`
/// suffix is stripped; any `/task_<suffix>` parses so that unknown task
/// numbers can be answered.
pub fn parse_command(text: &str) -> Result<Command, CommandParseError> {
    let Some(raw_command) = text.split_whitespace().next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head);

    if let Some(suffix) = command.strip_prefix("/task_") {
        return Ok(Command::Task(suffix.to_string()));
    }
    MenuCommand::parse(command, "")
        .map(Command::from)
        .map_err(|_| CommandParseError::UnknownCommand(command.to_string()))
}

/// The fixed task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    JoinGroup,
    JoinChannel,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::JoinGroup, Task::JoinChannel];

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "1" => Some(Task::JoinGroup),
            "2" => Some(Task::JoinChannel),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Task::JoinGroup => formatters::GROUP_TASK_TITLE,
            Task::JoinChannel => formatters::CHANNEL_TASK_TITLE,
        }
    }
}

/// Commands shown in the Telegram "/" menu.
pub fn bot_commands() -> Vec<BotCommand> {
    MenuCommand::bot_commands()
}

/// Text answer for a command. Never fails: every error path degrades to a
/// user-facing string.
pub async fn reply_for(ctx: &AppContext, user_id: Option<i64>, command: &Command) -> String {
    match command {
        Command::Start | Command::Help => formatters::WELCOME.to_string(),
        Command::Tasks => {
            let titles: Vec<&str> = Task::ALL.iter().map(|task| task.title()).collect();
            formatters::task_list(&titles)
        }
        Command::Task(suffix) => match Task::from_suffix(suffix) {
            Some(Task::JoinGroup) => {
                let link = invite_link_or_fallback(ctx.invites.as_ref(), ctx.config.group_id).await;
                formatters::group_task(&link)
            }
            Some(Task::JoinChannel) => formatters::channel_task(&ctx.config.channel_id),
            None => formatters::INVALID_TASK.to_string(),
        },
        Command::Points => {
            let Some(user_id) = user_id else {
                return formatters::BALANCE_UNAVAILABLE.to_string();
            };
            match ctx.store.get_account(user_id) {
                Ok(account) => formatters::balance(account.map_or(0, |a| a.points)),
                Err(e) => {
                    error!(user_id, error = %e, "Failed to read balance");
                    formatters::BALANCE_UNAVAILABLE.to_string()
                }
            }
        }
    }
}

/// A command message lifted out of a transport update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand {
    pub chat_id: i64,
    pub message_id: i32,
    pub user_id: Option<i64>,
    pub text: String,
}

/// Answers one command message. Unknown commands get no reply.
pub async fn answer(ctx: &AppContext, incoming: &IncomingCommand) {
    let command = match parse_command(&incoming.text) {
        Ok(command) => command,
        Err(e) => {
            debug!(chat_id = incoming.chat_id, error = %e, "Ignoring message");
            return;
        }
    };

    let reply = reply_for(ctx, incoming.user_id, &command).await;
    if let Err(e) = ctx
        .messenger
        .reply(incoming.chat_id, incoming.message_id, &reply)
        .await
    {
        error!(chat_id = incoming.chat_id, error = %e, "Failed to send command reply");
    }
}

/// Responder task: answers commands until the sending side is dropped.
pub async fn run_responder(ctx: Arc<AppContext>, mut rx: mpsc::Receiver<IncomingCommand>) {
    info!("Command responder started");
    while let Some(incoming) = rx.recv().await {
        answer(&ctx, &incoming).await;
    }
    info!("Command responder stopped");
}
