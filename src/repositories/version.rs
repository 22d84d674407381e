use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{Page, RepositoryError, now};
use crate::entities::{version, version_file};

#[derive(Debug, Clone)]
pub struct NewVersion {
    pub project_id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Fields to change. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct VersionChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[async_trait]
pub trait VersionRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<version::Model, RepositoryError>;
    async fn list(
        &self,
        project_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<version::Model>, RepositoryError>;
    async fn create(&self, version: NewVersion) -> Result<version::Model, RepositoryError>;
    async fn update(
        &self,
        id: i32,
        changes: VersionChanges,
    ) -> Result<version::Model, RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
    /// Link a file to a version. An existing link is a `Conflict`.
    async fn attach_file(&self, version_id: i32, file_id: i32) -> Result<(), RepositoryError>;
    /// Unlink a file from a version. A missing link is `NotFound`.
    async fn detach_file(&self, version_id: i32, file_id: i32) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct SqlVersionRepository {
    db: DatabaseConnection,
}

impl SqlVersionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VersionRepository for SqlVersionRepository {
    async fn get_by_id(&self, id: i32) -> Result<version::Model, RepositoryError> {
        version::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(
        &self,
        project_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<version::Model>, RepositoryError> {
        let mut query = version::Entity::find().order_by_asc(version::Column::Id);
        if let Some(project_id) = project_id {
            query = query.filter(version::Column::ProjectId.eq(project_id));
        }
        let total = query.clone().count(&self.db).await?;
        let items = query.limit(limit).offset(offset).all(&self.db).await?;
        Ok(Page { items, total })
    }

    async fn create(&self, new: NewVersion) -> Result<version::Model, RepositoryError> {
        let timestamp = now();
        let model = version::ActiveModel {
            project_id: Set(new.project_id),
            name: Set(new.name),
            description: Set(new.description),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update(
        &self,
        id: i32,
        changes: VersionChanges,
    ) -> Result<version::Model, RepositoryError> {
        let mut model = self.get_by_id(id).await?.into_active_model();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        model.updated_at = Set(now());
        Ok(model.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        version_file::Entity::delete_many()
            .filter(version_file::Column::VersionId.eq(id))
            .exec(&txn)
            .await?;
        let result = version::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn attach_file(&self, version_id: i32, file_id: i32) -> Result<(), RepositoryError> {
        let existing = version_file::Entity::find_by_id((version_id, file_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "file {file_id} is already attached to version {version_id}"
            )));
        }

        let link = version_file::ActiveModel {
            version_id: Set(version_id),
            file_id: Set(file_id),
            created_at: Set(now()),
        };
        // A concurrent attach still trips the primary key.
        version_file::Entity::insert(link)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn detach_file(&self, version_id: i32, file_id: i32) -> Result<(), RepositoryError> {
        let result = version_file::Entity::delete_by_id((version_id, file_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
