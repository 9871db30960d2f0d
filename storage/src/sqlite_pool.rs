//! SQLite connection pool wrapper for the storage crate.

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Manages a single SQLite pool; `new` creates the DB file if missing, `open_existing` never does.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

impl SqlitePoolManager {
    /// Creates a pool for the given database URL (`sqlite:` URL, plain file path, or `sqlite::memory:`).
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Initializing SQLite pool: {}", database_url);
        Self::connect(database_url, Self::options(database_url)?.create_if_missing(true)).await
    }

    /// Opens an existing database read-only. Fails instead of creating a missing file.
    pub async fn open_existing(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Opening SQLite database read-only: {}", database_url);
        let mut options = Self::options(database_url)?.create_if_missing(false);
        if !Self::is_memory(database_url) {
            options = options.read_only(true);
        }
        Self::connect(database_url, options).await
    }

    fn options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
        if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)
        } else {
            Ok(SqliteConnectOptions::new().filename(database_url.trim_start_matches("file:")))
        }
    }

    fn is_memory(database_url: &str) -> bool {
        database_url.contains(":memory:")
    }

    async fn connect(database_url: &str, options: SqliteConnectOptions) -> Result<Self, sqlx::Error> {
        // An in-memory database lives and dies with its connection: keep exactly one, forever.
        let pool = if Self::is_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
