//! CLI error type.

use cablestore_client::error::TransportError;
use cablestore_client::{ClientError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}", .0.user_message(&.0.to_string()))]
    Client(#[from] ClientError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("Cannot determine where to keep credentials; set CABLESTORE_CREDENTIALS_PATH")]
    NoCredentialsPath,

    #[error("Not logged in")]
    NotLoggedIn,
}
