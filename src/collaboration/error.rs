use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::github::{reset_hint, FetchError};
use crate::storage::StoreError;

/// Failure of one service call. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no such repository: {0}")]
    NotFound(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("unknown repository: {0}")]
    UnknownRepository(String),

    #[error("GitHub API request rate limit reached{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error(transparent)]
    Transport(FetchError),

    #[error(transparent)]
    Persistence(StoreError),

    #[error("conflicting write: {0}")]
    Conflict(#[source] StoreError),
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::RateLimited { reset_at } => ServiceError::RateLimited { reset_at },
            FetchError::RepositoryNotFound(full_name) => ServiceError::NotFound(full_name),
            other => ServiceError::Transport(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_constraint_violation() {
            ServiceError::Conflict(err)
        } else {
            ServiceError::Persistence(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
