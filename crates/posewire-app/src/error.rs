use posewire_config::ConfigError;
use posewire_net::{ClientError, ServerError};

/// Errors that end a `posewire` command.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    #[error("failed to build runtime: {0}")]
    Runtime(std::io::Error),
}
