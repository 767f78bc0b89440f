use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::Config;
use crate::context::AppContext;
use crate::membership::{run_ledger, TrackedChats};
use crate::storage::PointsStore;
use crate::supervisor::Supervisor;
use crate::telegram::commands::{bot_commands, run_responder};
use crate::telegram::gateway::TelegramGateway;
use crate::telegram::poller::{UpdatePoller, UpdateRouter};

const CHANNEL_CAPACITY: usize = 256;

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

pub fn build_bot(config: &Config) -> crate::error::Result<Bot> {
    let timeout = Duration::from_secs(u64::from(config.poll_timeout_secs)) + HTTP_TIMEOUT_MARGIN;
    let client = teloxide::net::default_reqwest_settings()
        .timeout(timeout)
        .build()
        .map_err(anyhow::Error::from)?;
    Ok(Bot::with_client(config.bot_token.clone(), client))
}

async fn register_bot_commands(bot: &Bot) {
    match bot.set_my_commands(bot_commands()).await {
        Ok(_) => info!("Registered bot commands with Telegram"),
        Err(e) => warn!(error = %e, "Failed to register bot commands with Telegram"),
    }
}

/// Runs the bot until Ctrl-C.
///
/// One supervised task long-polls for updates and hands commands to the
/// responder task and membership events to the ledger task. On shutdown the
/// poller stops first; dropping its channels lets the other two drain.
pub async fn run_telegram_bot(config: Config) -> crate::error::Result<()> {
    info!("Starting bot...");

    let store = PointsStore::open(&config.database_path, config.balance_policy)?;
    let bot = build_bot(&config)?;
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let ctx = Arc::new(AppContext::new(config, store, gateway.clone(), gateway));

    register_bot_commands(&bot).await;

    let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let responder = tokio::spawn(run_responder(Arc::clone(&ctx), commands_rx));
    let ledger = tokio::spawn(run_ledger(Arc::clone(&ctx), events_rx));

    let router = UpdateRouter::new(TrackedChats::from_config(&ctx.config), commands_tx, events_tx);
    let mut poller = UpdatePoller::new(bot, ctx.config.poll_timeout_secs, router);
    let mut supervisor = Supervisor::new(ctx.config.backoff_policy());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let polling = tokio::spawn(async move { supervisor.run(&mut poller, shutdown_rx).await });

    info!(
        api_id = ctx.config.api_id,
        group_id = ctx.config.group_id,
        channel = %ctx.config.channel(),
        "Bot is running. Tracking new user joins. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await.map_err(anyhow::Error::from)?;
    info!("Shutdown requested, stopping polling...");
    let _ = shutdown_tx.send(true);

    let report = polling.await.map_err(anyhow::Error::from)?;
    responder.await.map_err(anyhow::Error::from)?;
    ledger.await.map_err(anyhow::Error::from)?;

    info!(
        steps = report.steps,
        failures = report.failures,
        circuit_trips = report.trips,
        "Bot stopped"
    );
    Ok(())
}
