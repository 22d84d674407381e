use std::sync::Arc;

use super::error::{ServiceError, required};
use crate::entities::version;
use crate::repositories::{
    FileRepository, NewVersion, Page, ProjectRepository, RepositoryError, VersionChanges,
    VersionRepository,
};

/// Versions of a project and the files attached to them.
#[derive(Clone)]
pub struct VersionService {
    versions: Arc<dyn VersionRepository>,
    projects: Arc<dyn ProjectRepository>,
    files: Arc<dyn FileRepository>,
}

impl VersionService {
    pub fn new(
        versions: Arc<dyn VersionRepository>,
        projects: Arc<dyn ProjectRepository>,
        files: Arc<dyn FileRepository>,
    ) -> Self {
        Self {
            versions,
            projects,
            files,
        }
    }

    async fn ensure_project(&self, project_id: i32) -> Result<(), ServiceError> {
        self.projects
            .get_by_id(project_id)
            .await
            .map(|_| ())
            .map_err(ServiceError::from_repo("project"))
    }

    pub async fn list(
        &self,
        project_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<version::Model>, ServiceError> {
        if let Some(project_id) = project_id {
            self.ensure_project(project_id).await?;
        }
        self.versions
            .list(project_id, limit, offset)
            .await
            .map_err(ServiceError::from_repo("version"))
    }

    pub async fn get(&self, id: i32) -> Result<version::Model, ServiceError> {
        self.versions
            .get_by_id(id)
            .await
            .map_err(ServiceError::from_repo("version"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        project_id: i32,
        name: &str,
        description: Option<&str>,
    ) -> Result<version::Model, ServiceError> {
        let name = required("name", name)?;
        self.ensure_project(project_id).await?;

        let version = self
            .versions
            .create(NewVersion {
                project_id,
                name,
                description: description.map(str::to_string),
            })
            .await
            .map_err(ServiceError::from_repo("version"))?;
        tracing::info!(version_id = version.id, "version created");
        Ok(version)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<version::Model, ServiceError> {
        let changes = VersionChanges {
            name: name.map(|n| required("name", n)).transpose()?,
            description: description.map(|d| d.map(str::to_string)),
        };
        self.versions
            .update(id, changes)
            .await
            .map_err(ServiceError::from_repo("version"))
    }

    /// Delete a version and its attachments. Attached files are kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        self.versions
            .delete(id)
            .await
            .map_err(ServiceError::from_repo("version"))?;
        tracing::info!("version deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn attach_file(&self, version_id: i32, file_id: i32) -> Result<(), ServiceError> {
        self.get(version_id).await?;
        self.files
            .get_by_id(file_id)
            .await
            .map_err(ServiceError::from_repo("file"))?;

        match self.versions.attach_file(version_id, file_id).await {
            Ok(()) => {
                tracing::info!("file attached");
                Ok(())
            }
            Err(RepositoryError::Conflict(_)) => Err(ServiceError::AlreadyAttached),
            Err(err) => Err(ServiceError::from_repo("file")(err)),
        }
    }

    /// Remove the link between a version and a file. The file stays.
    #[tracing::instrument(skip(self))]
    pub async fn detach_file(&self, version_id: i32, file_id: i32) -> Result<(), ServiceError> {
        self.get(version_id).await?;
        self.versions
            .detach_file(version_id, file_id)
            .await
            .map_err(ServiceError::from_repo("file attachment"))?;
        tracing::info!("file detached");
        Ok(())
    }
}
