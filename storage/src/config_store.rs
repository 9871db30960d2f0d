use crate::error::StorageError;
use async_trait::async_trait;
use bot_core::BotConfig;

/// A change applied to the configuration inside one transaction.
pub type ConfigMutation = Box<dyn FnOnce(&mut BotConfig) + Send>;

/// Transactional persistence of a single bot configuration row.
///
/// Single writer: exactly one running bot loop owns a given row.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Reads the current configuration.
    async fn load(&self) -> Result<BotConfig, StorageError>;

    /// Applies `mutation` atomically: either every field it changed is persisted, or none is.
    /// Returns the configuration as committed.
    async fn mutate(&self, mutation: ConfigMutation) -> Result<BotConfig, StorageError>;
}
