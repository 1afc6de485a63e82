use thiserror::Error;

use crate::config::ConfigError;
use crate::id::IdError;
use crate::snapshot::SnapshotError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing; nothing was enqueued.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Rejected synchronously by a mutation entry point.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidId(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
