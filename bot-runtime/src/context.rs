//! Live dependencies shared by every lifecycle handler.

use bot_core::{BotConfig, BotState, MatrixClient, Result};
use std::sync::Arc;
use std::time::Duration;
use storage::ConfigStore;
use tokio_util::sync::CancellationToken;

use crate::shutdown::ShutdownHooks;

/// Tunables of the loop itself (not persisted).
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Delay after the first failed poll; doubles on each consecutive failure.
    pub poll_backoff_base: Duration,
    /// Upper bound for the poll retry delay.
    pub poll_backoff_max: Duration,
    /// Pause before re-reading an unrecognised persisted state.
    pub unknown_state_backoff: Duration,
    /// The bot's own Matrix user id; its own events are never treated as commands.
    pub bot_user_id: Option<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            poll_backoff_base: Duration::from_secs(1),
            poll_backoff_max: Duration::from_secs(60),
            unknown_state_backoff: Duration::from_secs(5),
            bot_user_id: None,
        }
    }
}

/// Configuration store, homeserver client, shutdown hooks and cancellation for one bot instance.
pub struct BotContext {
    pub store: Arc<dyn ConfigStore>,
    pub client: Arc<dyn MatrixClient>,
    pub shutdown: ShutdownHooks,
    pub cancel: CancellationToken,
    pub options: RuntimeOptions,
}

impl BotContext {
    pub fn new(store: Arc<dyn ConfigStore>, client: Arc<dyn MatrixClient>) -> Self {
        Self {
            store,
            client,
            shutdown: ShutdownHooks::new(),
            cancel: CancellationToken::new(),
            options: RuntimeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses an externally owned token, e.g. one cancelled by a signal handler.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current persisted configuration.
    pub async fn config(&self) -> Result<BotConfig> {
        Ok(self.store.load().await?)
    }

    /// Persists a new lifecycle state in its own transaction.
    pub async fn set_state(&self, state: BotState) -> Result<BotConfig> {
        Ok(self
            .store
            .mutate(Box::new(move |config| config.set_state(state)))
            .await?)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether `sender` is the bot itself.
    pub fn is_own_event(&self, sender: &str) -> bool {
        self.options.bot_user_id.as_deref() == Some(sender)
    }
}
