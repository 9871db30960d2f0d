//! Storage crate: transactional persistence of the bot configuration.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – ConfigRecord (row model of `bot_config`)
//! - [`config_store`] – ConfigStore trait
//! - [`sqlite_config_store`] – SqliteConfigStore (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod config_store;
mod error;
mod models;
mod sqlite_config_store;
mod sqlite_pool;

pub use config_store::{ConfigMutation, ConfigStore};
pub use error::StorageError;
pub use models::ConfigRecord;
pub use sqlite_config_store::SqliteConfigStore;
pub use sqlite_pool::SqlitePoolManager;
