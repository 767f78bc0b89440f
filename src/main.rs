use clap::Parser;
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gambie_bot::cli::{Cli, Commands};
use gambie_bot::storage::{PointsStore, Scope};
use gambie_bot::{telegram, utils, BotError, Config, Result};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gambie_bot=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => telegram::run_telegram_bot(config).await,

        Commands::Init => {
            info!("Initializing...");
            initialize(&config)
        }

        Commands::Account { user_id, format } => show_account(&config, user_id, &format),

        Commands::Stats { format } => {
            info!("Generating statistics...");
            show_stats(&config, &format)
        }
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn open_store(config: &Config) -> Result<PointsStore> {
    PointsStore::open(&config.database_path, config.balance_policy)
}

fn initialize(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    println!(
        "{} Points database ready at {}",
        "✓".green(),
        store.path().display().to_string().cyan()
    );
    println!("Balance policy: {:?}", store.policy());
    Ok(())
}

fn show_account(config: &Config, user_id: i64, format: &str) -> Result<()> {
    let store = open_store(config)?;
    let account = store
        .get_account(user_id)?
        .ok_or(BotError::AccountNotFound(user_id))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&account)?);
        return Ok(());
    }

    let widths = [14, 16, 8, 8, 24];
    utils::print_table_border(78);
    utils::print_table_row(
        &["User", "Points", "Group", "Channel", "Last updated"],
        &widths,
    );
    utils::print_table_border(78);
    utils::print_table_row(
        &[
            &account.id.to_string(),
            &utils::format_points(account.points),
            utils::format_flag(account.is_member(Scope::Group)),
            utils::format_flag(account.is_member(Scope::Channel)),
            &utils::format_timestamp(&account.last_updated),
        ],
        &widths,
    );
    utils::print_table_border(78);
    Ok(())
}

fn show_stats(config: &Config, format: &str) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{}", "=== Points Statistics ===".cyan().bold());
    println!("Users:            {}", stats.total_users);
    println!("Total points:     {}", utils::format_points(stats.total_points));
    println!("Group members:    {}", stats.group_members);
    println!("Channel members:  {}", stats.channel_members);
    Ok(())
}
