//! Persistence contracts for projects, versions and files, with sea-orm
//! backed implementations.

pub mod file;
pub mod project;
pub mod version;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub use file::{CompletedUpload, FileRepository, SqlFileRepository};
pub use project::{NewProject, ProjectChanges, ProjectRepository, SqlProjectRepository};
pub use version::{NewVersion, SqlVersionRepository, VersionChanges, VersionRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(DbErr),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::Conflict(detail);
        }
        match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self::NotFound,
            other => Self::Db(other),
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
