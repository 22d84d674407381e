use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::repositories::{SqlFileRepository, SqlProjectRepository, SqlVersionRepository};
use crate::services::{FileService, ProjectService, VersionService};
use crate::storage::FileStorage;

/// Shared handler state. Cloned per request; everything inside is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub projects: ProjectService,
    pub versions: VersionService,
    pub files: FileService,
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn FileStorage>, max_upload_size: usize) -> Self {
        let project_repo = Arc::new(SqlProjectRepository::new(db.clone()));
        let version_repo = Arc::new(SqlVersionRepository::new(db.clone()));
        let file_repo = Arc::new(SqlFileRepository::new(db));

        Self {
            projects: ProjectService::new(project_repo.clone()),
            versions: VersionService::new(version_repo, project_repo, file_repo.clone()),
            files: FileService::new(file_repo, storage),
            max_upload_size,
        }
    }
}
