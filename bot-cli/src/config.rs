//! Bot configuration loaded from environment variables (`.env` is read by the binary first).

use anyhow::{Context, Result};
use bot_core::{BotConfig, DEFAULT_TIMEOUT_MS};
use bot_runtime::RuntimeOptions;
use std::env;

/// Where the configuration row lives. Enough for commands that only touch the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// DATABASE_URL
    pub database_url: String,
    /// BOT_ID: configuration row id
    pub bot_id: String,
}

impl StoreSettings {
    pub fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "./matrix_bot.db".to_string()),
            bot_id: optional("BOT_ID").unwrap_or_else(|| "default".to_string()),
        }
    }
}

/// Full configuration for `mbot run`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreSettings,
    /// MATRIX_HOMESERVER
    pub homeserver: String,
    /// MATRIX_ACCESS_TOKEN
    pub access_token: String,
    /// MATRIX_USER_ID: the bot's own user id, used to ignore its own messages
    pub bot_user_id: Option<String>,
    /// LOG_FILE
    pub log_file: String,
    /// BOT_OWNER, seeded into a new row
    pub owner: Option<String>,
    /// BOT_PREFIX, seeded into a new row
    pub prefix: Option<String>,
    /// FILTER_ID, seeded into a new row
    pub filter_id: Option<String>,
    /// SYNC_TIMEOUT_MS, seeded into a new row
    pub sync_timeout_ms: u64,
    /// SKIP_INITIAL_SYNC, seeded into a new row
    pub skip_initial_sync: bool,
    /// EXIT_ON_EMPTY_ROOMS, applied on every start
    pub exit_on_empty_rooms: bool,
}

impl AppConfig {
    /// Loads from environment variables. `access_token` overrides MATRIX_ACCESS_TOKEN if provided.
    pub fn load(access_token: Option<String>) -> Result<Self> {
        let homeserver = env::var("MATRIX_HOMESERVER").context("MATRIX_HOMESERVER not set")?;
        let access_token = match access_token {
            Some(token) => token,
            None => env::var("MATRIX_ACCESS_TOKEN").context("MATRIX_ACCESS_TOKEN not set")?,
        };

        Ok(Self {
            store: StoreSettings::load(),
            homeserver,
            access_token,
            bot_user_id: optional("MATRIX_USER_ID"),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/matrix-bot.log".to_string()),
            owner: optional("BOT_OWNER"),
            prefix: optional("BOT_PREFIX"),
            filter_id: optional("FILTER_ID"),
            sync_timeout_ms: parsed("SYNC_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS),
            skip_initial_sync: parsed("SKIP_INITIAL_SYNC").unwrap_or(true),
            exit_on_empty_rooms: parsed("EXIT_ON_EMPTY_ROOMS").unwrap_or(false),
        })
    }

    /// Validates config before anything is started.
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.homeserver).is_err() {
            anyhow::bail!("MATRIX_HOMESERVER is not a valid URL: {}", self.homeserver);
        }
        if self.access_token.trim().is_empty() {
            anyhow::bail!("MATRIX_ACCESS_TOKEN is empty");
        }
        if self.store.bot_id.trim().is_empty() {
            anyhow::bail!("BOT_ID is empty");
        }
        Ok(())
    }

    /// Row written when the store holds nothing for this bot yet.
    pub fn seed(&self) -> BotConfig {
        let mut config = BotConfig::new(self.store.bot_id.clone());
        config.owner = self.owner.clone();
        config.prefix = self.prefix.clone();
        config.filter_id = self.filter_id.clone();
        config.timeout_ms = self.sync_timeout_ms;
        config.skip_initial_sync = self.skip_initial_sync;
        config.exit_on_empty_rooms = self.exit_on_empty_rooms;
        config
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            bot_user_id: self.bot_user_id.clone(),
            ..RuntimeOptions::default()
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
