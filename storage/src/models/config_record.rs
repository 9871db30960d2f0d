//! Bot configuration row model.
//!
//! Maps to the `bot_config` table and is used by SqliteConfigStore.

use bot_core::{BotConfig, PersistedState, DEFAULT_TIMEOUT_MS};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigRecord {
    pub id: String,
    pub state: String,
    pub next_batch: Option<String>,
    pub filter_id: Option<String>,
    pub timeout_ms: i64,
    pub owner: Option<String>,
    pub prefix: Option<String>,
    pub skip_initial_sync: bool,
    pub exit_on_empty_rooms: bool,
    pub updated_at: DateTime<Utc>,
}

impl ConfigRecord {
    /// Builds a row from a domain config, stamped with the current time.
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            id: config.id.clone(),
            state: config.state.as_str().to_string(),
            next_batch: config.next_batch.clone(),
            filter_id: config.filter_id.clone(),
            timeout_ms: i64::try_from(config.timeout_ms).unwrap_or(i64::MAX),
            owner: config.owner.clone(),
            prefix: config.prefix.clone(),
            skip_initial_sync: config.skip_initial_sync,
            exit_on_empty_rooms: config.exit_on_empty_rooms,
            updated_at: Utc::now(),
        }
    }

    pub fn into_config(self) -> BotConfig {
        BotConfig {
            id: self.id,
            state: PersistedState::parse(&self.state),
            next_batch: self.next_batch,
            filter_id: self.filter_id,
            timeout_ms: u64::try_from(self.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS),
            owner: self.owner,
            prefix: self.prefix,
            skip_initial_sync: self.skip_initial_sync,
            exit_on_empty_rooms: self.exit_on_empty_rooms,
        }
    }
}
