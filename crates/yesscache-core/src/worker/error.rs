use thiserror::Error;

use crate::api::ApiError;
use crate::cache::StorageError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("Install of {version} failed: {reason}")]
    Install { version: String, reason: String },

    #[error("No installed version is waiting to activate")]
    NothingWaiting,

    #[error("No version is active yet")]
    NotActivated,

    #[error("Waiting version {waiting} does not match configured version {configured}")]
    VersionMismatch { waiting: String, configured: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
