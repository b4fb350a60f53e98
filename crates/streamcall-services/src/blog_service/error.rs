//! Error types for the resource repository.

use streamcall::store::StoreError;
use streamcall::Status;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The id is not a valid store identifier.
    #[error("Malformed resource id: {0}")]
    InvalidId(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<RepositoryError> for Status {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::InvalidId(_) => Status::invalid_argument(e.to_string()),
            RepositoryError::NotFound(_) => Status::not_found(e.to_string()),
            RepositoryError::Store(_) => Status::internal(e.to_string()),
        }
    }
}
