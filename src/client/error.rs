use thiserror::Error;

use crate::client::api::ApiError;
use crate::client::local_db::StorageError;
use crate::client::sync::SyncServiceError;
use crate::shared::config::ConfigError;

/// Errors raised while building or driving the offline client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] ApiError),

    #[error(transparent)]
    Sync(#[from] SyncServiceError),
}
