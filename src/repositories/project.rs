use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{Page, RepositoryError, now};
use crate::entities::{project, version, version_file};

#[derive(Debug, Clone)]
pub struct NewProject {
    pub slug: String,
    pub name: String,
}

/// Fields to change; `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub slug: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<project::Model, RepositoryError>;
    async fn list(&self, limit: u64, offset: u64) -> Result<Page<project::Model>, RepositoryError>;
    async fn create(&self, project: NewProject) -> Result<project::Model, RepositoryError>;
    async fn update(
        &self,
        id: i32,
        changes: ProjectChanges,
    ) -> Result<project::Model, RepositoryError>;
    /// Remove the project together with its versions and their file
    /// associations. Files themselves are kept.
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct SqlProjectRepository {
    db: DatabaseConnection,
}

impl SqlProjectRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn get_by_id(&self, id: i32) -> Result<project::Model, RepositoryError> {
        project::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, limit: u64, offset: u64) -> Result<Page<project::Model>, RepositoryError> {
        let query = project::Entity::find().order_by_asc(project::Column::Id);
        let total = query.clone().count(&self.db).await?;
        let items = query.limit(limit).offset(offset).all(&self.db).await?;
        Ok(Page { items, total })
    }

    async fn create(&self, new: NewProject) -> Result<project::Model, RepositoryError> {
        let timestamp = now();
        let model = project::ActiveModel {
            slug: Set(new.slug),
            name: Set(new.name),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update(
        &self,
        id: i32,
        changes: ProjectChanges,
    ) -> Result<project::Model, RepositoryError> {
        let mut model = self.get_by_id(id).await?.into_active_model();
        if let Some(slug) = changes.slug {
            model.slug = Set(slug);
        }
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        model.updated_at = Set(now());
        Ok(model.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        let version_ids: Vec<i32> = version::Entity::find()
            .select_only()
            .column(version::Column::Id)
            .filter(version::Column::ProjectId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;
        if !version_ids.is_empty() {
            version_file::Entity::delete_many()
                .filter(version_file::Column::VersionId.is_in(version_ids))
                .exec(&txn)
                .await?;
        }
        version::Entity::delete_many()
            .filter(version::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?;

        let result = project::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }
}
