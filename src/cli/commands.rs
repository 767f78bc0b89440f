use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gambie-bot")]
#[command(about = "Telegram bot that rewards group and channel membership with points")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot until interrupted
    Run,

    /// Create the points database if it does not exist
    Init,

    /// Show a single user's account
    Account {
        /// Telegram user id
        user_id: i64,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show points statistics
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account() {
        let cli = Cli::try_parse_from(["gambie-bot", "account", "42", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Account { user_id, format } => {
                assert_eq!(user_id, 42);
                assert_eq!(format, "json");
            }
            _ => panic!("expected account command"),
        }
    }

    #[test]
    fn test_stats_defaults_to_table() {
        let cli = Cli::try_parse_from(["gambie-bot", "stats"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { format } if format == "table"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["gambie-bot"]).is_err());
    }
}
