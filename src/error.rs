//! Crate error type

use thiserror::Error;

use crate::client::ClientError;
use crate::media::MediaError;
use crate::orchestrator::SpawnError;
use crate::persist::PersistError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
