use std::sync::Arc;

use super::error::{ServiceError, required};
use crate::entities::project;
use crate::repositories::{NewProject, Page, ProjectChanges, ProjectRepository, RepositoryError};

#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
}

fn conflict(slug: &str) -> impl Fn(RepositoryError) -> ServiceError + '_ {
    move |err| match err {
        RepositoryError::Conflict(_) => {
            ServiceError::AlreadyExists(format!("a project with slug '{slug}' already exists"))
        }
        other => ServiceError::from_repo("project")(other),
    }
}

impl ProjectService {
    pub fn new(projects: Arc<dyn ProjectRepository>) -> Self {
        Self { projects }
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<Page<project::Model>, ServiceError> {
        self.projects
            .list(limit, offset)
            .await
            .map_err(ServiceError::from_repo("project"))
    }

    pub async fn get(&self, id: i32) -> Result<project::Model, ServiceError> {
        self.projects
            .get_by_id(id)
            .await
            .map_err(ServiceError::from_repo("project"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, slug: &str, name: &str) -> Result<project::Model, ServiceError> {
        let slug = required("slug", slug)?;
        let name = required("name", name)?;

        let project = self
            .projects
            .create(NewProject {
                slug: slug.clone(),
                name,
            })
            .await
            .map_err(conflict(&slug))?;
        tracing::info!(project_id = project.id, "project created");
        Ok(project)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        slug: Option<&str>,
        name: Option<&str>,
    ) -> Result<project::Model, ServiceError> {
        let changes = ProjectChanges {
            slug: slug.map(|s| required("slug", s)).transpose()?,
            name: name.map(|n| required("name", n)).transpose()?,
        };
        let slug = changes.slug.clone().unwrap_or_default();

        self.projects
            .update(id, changes)
            .await
            .map_err(conflict(&slug))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        self.projects
            .delete(id)
            .await
            .map_err(ServiceError::from_repo("project"))?;
        tracing::info!("project deleted");
        Ok(())
    }
}
