use thiserror::Error;

use super::monitoring_repository::RepoError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("store failure: {0}")]
    Store(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Convert a repository error, naming the entity a `NotFound` refers to.
    pub fn from_repo(error: RepoError, entity: &str) -> Self {
        match error {
            RepoError::NotFound => Self::not_found(entity),
            RepoError::Duplicate(detail) => Self::Validation(detail),
            RepoError::Store { message } => Self::Store(message),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(error: RepoError) -> Self {
        Self::from_repo(error, "record")
    }
}

pub type AppResult<T> = Result<T, AppError>;
