use sea_orm::DbErr;
use thiserror::Error;

use crate::repositories::RepositoryError;
use crate::storage::StorageError;

/// Errors returned by the project, version and file services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("file has already been uploaded")]
    AlreadyComplete,

    #[error("file upload has not completed")]
    NotComplete,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("file is already attached to this version")]
    AlreadyAttached,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Database(DbErr),
}

impl ServiceError {
    /// Map a repository error for `entity`, turning conflicts into
    /// `AlreadyExists`.
    pub(crate) fn from_repo(entity: &'static str) -> impl Fn(RepositoryError) -> Self {
        move |err| match err {
            RepositoryError::NotFound => Self::NotFound(entity),
            RepositoryError::Conflict(detail) => {
                Self::AlreadyExists(format!("{entity} already exists: {detail}"))
            }
            RepositoryError::Db(e) => Self::Database(e),
        }
    }
}

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
