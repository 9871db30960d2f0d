use anyhow::{Context, Result};
use bot_core::{init_tracing, BotConfig};
use bot_runtime::{BotContext, BotLifecycleStateMachine, CancellationToken, DefaultBehavior};
use matrix_client::HttpMatrixClient;
use std::sync::Arc;
use storage::{ConfigStore, SqliteConfigStore};
use tracing::{info, instrument};

use crate::config::{AppConfig, StoreSettings};

/// Main entry: validate config, init logging, open the store, then drive the lifecycle until it exits
/// or Ctrl-C cancels it.
#[instrument(skip(config), fields(bot_id = %config.store.bot_id))]
pub async fn run_bot(config: AppConfig) -> Result<()> {
    config.validate()?;
    init_tracing(&config.log_file)?;

    info!(
        homeserver = %config.homeserver,
        database_url = %config.store.database_url,
        "Initializing bot"
    );

    let store = SqliteConfigStore::new(&config.store.database_url, config.seed())
        .await
        .context("Open configuration store")?;
    let exit_on_empty_rooms = config.exit_on_empty_rooms;
    let current = store
        .mutate(Box::new(move |row| row.exit_on_empty_rooms = exit_on_empty_rooms))
        .await?;
    info!(
        state = %current.state,
        next_batch = ?current.next_batch,
        exit_on_empty_rooms,
        "Configuration loaded"
    );

    let client = HttpMatrixClient::new(&config.homeserver, config.access_token.clone())?;

    let cancel = CancellationToken::new();
    let ctx = BotContext::new(Arc::new(store), Arc::new(client))
        .with_options(config.runtime_options())
        .with_cancellation(cancel.clone());

    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current cycle");
            cancel.cancel();
        }
    });
    ctx.shutdown.register(move || {
        signal_task.abort();
        info!("Bot stopped");
    });

    let machine =
        BotLifecycleStateMachine::new(Arc::new(ctx), Arc::new(DefaultBehavior::default()));
    machine.run().await?;
    Ok(())
}

/// Reads the configuration row without contacting the homeserver. Opens the database read-only, so a
/// missing database, table, or row is reported instead of created.
pub async fn load_status(settings: &StoreSettings) -> Result<BotConfig> {
    let store = SqliteConfigStore::open_existing(&settings.database_url, &settings.bot_id)
        .await
        .context("Open configuration store")?;
    store
        .load()
        .await
        .with_context(|| format!("No configuration for bot {}", settings.bot_id))
}
