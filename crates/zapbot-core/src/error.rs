use thiserror::Error;

/// Top-level error type for zapbot.
#[derive(Debug, Error)]
pub enum ZapError {
    /// Error from the reply provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Catalog/storage error.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
