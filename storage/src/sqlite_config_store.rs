//! Bot configuration store backed by SQLite.
//!
//! One row per bot id in `bot_config`. Every mutation runs as read-modify-write inside a single
//! transaction, so cursor and state changes become visible together.

use crate::config_store::{ConfigMutation, ConfigStore};
use crate::error::StorageError;
use crate::models::ConfigRecord;
use crate::sqlite_pool::SqlitePoolManager;
use async_trait::async_trait;
use bot_core::BotConfig;
use tracing::{debug, info};

const SELECT_CONFIG: &str = "SELECT * FROM bot_config WHERE id = ?";

#[derive(Clone)]
pub struct SqliteConfigStore {
    pool_manager: SqlitePoolManager,
    bot_id: String,
}

impl SqliteConfigStore {
    /// Opens the store and makes sure a row for `defaults.id` exists.
    ///
    /// `defaults` is written only when the row is missing; an existing row is left untouched.
    pub async fn new(database_url: &str, defaults: BotConfig) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let store = Self {
            pool_manager,
            bot_id: defaults.id.clone(),
        };
        store.init().await?;
        store.seed(&defaults).await?;
        Ok(store)
    }

    /// Opens an existing database read-only, without creating the file, the table, or the row.
    ///
    /// A database without the `bot_config` table yields [`StorageError::NotFound`]; a missing row is
    /// reported the same way by [`ConfigStore::load`].
    pub async fn open_existing(database_url: &str, bot_id: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::open_existing(database_url).await?;

        let table: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'bot_config'",
        )
        .fetch_optional(pool_manager.pool())
        .await?;
        if table.is_none() {
            return Err(StorageError::NotFound(format!(
                "bot_config table in {}",
                database_url
            )));
        }

        Ok(Self {
            pool_manager,
            bot_id: bot_id.to_string(),
        })
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating bot_config table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bot_config (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                next_batch TEXT,
                filter_id TEXT,
                timeout_ms INTEGER NOT NULL,
                owner TEXT,
                prefix TEXT,
                skip_initial_sync INTEGER NOT NULL,
                exit_on_empty_rooms INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }

    async fn seed(&self, defaults: &BotConfig) -> Result<(), StorageError> {
        let record = ConfigRecord::from_config(defaults);

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO bot_config (id, state, next_batch, filter_id, timeout_ms, owner, prefix, skip_initial_sync, exit_on_empty_rooms, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.state)
        .bind(&record.next_batch)
        .bind(&record.filter_id)
        .bind(record.timeout_ms)
        .bind(&record.owner)
        .bind(&record.prefix)
        .bind(record.skip_initial_sync)
        .bind(record.exit_on_empty_rooms)
        .bind(record.updated_at)
        .execute(self.pool_manager.pool())
        .await?;

        if result.rows_affected() > 0 {
            info!(bot_id = %record.id, state = %record.state, "Created bot configuration");
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn load(&self) -> Result<BotConfig, StorageError> {
        let record = sqlx::query_as::<_, ConfigRecord>(SELECT_CONFIG)
            .bind(&self.bot_id)
            .fetch_optional(self.pool_manager.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("bot config {}", self.bot_id)))?;

        Ok(record.into_config())
    }

    async fn mutate(&self, mutation: ConfigMutation) -> Result<BotConfig, StorageError> {
        let mut tx = self.pool_manager.pool().begin().await?;

        let current = sqlx::query_as::<_, ConfigRecord>(SELECT_CONFIG)
            .bind(&self.bot_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("bot config {}", self.bot_id)))?;

        let mut config = current.into_config();
        mutation(&mut config);
        // The row key is fixed; a mutation cannot move the config to another id.
        config.id = self.bot_id.clone();
        let record = ConfigRecord::from_config(&config);

        sqlx::query(
            r#"
            UPDATE bot_config
            SET state = ?, next_batch = ?, filter_id = ?, timeout_ms = ?, owner = ?, prefix = ?,
                skip_initial_sync = ?, exit_on_empty_rooms = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.state)
        .bind(&record.next_batch)
        .bind(&record.filter_id)
        .bind(record.timeout_ms)
        .bind(&record.owner)
        .bind(&record.prefix)
        .bind(record.skip_initial_sync)
        .bind(record.exit_on_empty_rooms)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            bot_id = %record.id,
            state = %record.state,
            next_batch = ?record.next_batch,
            "Committed bot configuration"
        );
        Ok(config)
    }
}
