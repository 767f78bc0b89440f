use crate::storage::Scope;

pub const WELCOME: &str =
    "Welcome! I'm your Telegram Gambie bot. Use /tasks to see available tasks.";

pub const INVALID_TASK: &str = "Invalid task number.";

pub const INVITE_LINK_FALLBACK: &str = "Unable to generate invite link at the moment.";

pub const BALANCE_UNAVAILABLE: &str = "Unable to fetch your balance right now.";

pub const GROUP_TASK_TITLE: &str = "Join our GambieGroup";

pub const CHANNEL_TASK_TITLE: &str = "Join our Bonus Collectors channel";

pub fn group_task(invite_link: &str) -> String {
    format!("{}: {}", GROUP_TASK_TITLE, invite_link)
}

pub fn channel_task(channel_id: &str) -> String {
    format!("{}: https://t.me/{}", CHANNEL_TASK_TITLE, channel_id)
}

/// `/tasks` reply, one `/task_N: title` line per task.
pub fn task_list(titles: &[&str]) -> String {
    let lines: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("/task_{}: {}", i + 1, title))
        .collect();
    format!("Available tasks:\n{}", lines.join("\n"))
}

pub fn joined(scope: Scope, reward: i64, balance: i64) -> String {
    format!(
        "Thank you for joining our {}!\n{} points transferred to your account! Your total: {} points",
        scope, reward, balance
    )
}

pub fn left(scope: Scope, reward: i64, balance: i64) -> String {
    format!(
        "Sorry to see you leave the {}.\n{} points deducted from your account. Your total: {} points",
        scope, reward, balance
    )
}

pub fn balance(points: i64) -> String {
    format!("Your balance: {} points", points)
}
