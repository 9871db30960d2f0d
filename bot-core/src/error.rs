use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Client error: {0}")]
    Client(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
