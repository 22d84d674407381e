use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{Page, RepositoryError, now};
use crate::entities::{file, version_file};

/// The content fields written when an upload completes.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub size: i64,
    pub path: String,
    pub mime_type: String,
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<file::Model, RepositoryError>;
    /// Files ordered newest first, optionally only those attached to a version.
    async fn list(
        &self,
        version_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<file::Model>, RepositoryError>;
    /// Insert a metadata-only record.
    async fn create(&self, name: String) -> Result<file::Model, RepositoryError>;
    /// Set size, path and MIME type and flip `is_complete` in one update.
    ///
    /// Only matches a record that is still incomplete; if the record was
    /// completed in the meantime this returns `Conflict`.
    async fn complete_upload(
        &self,
        id: i32,
        upload: CompletedUpload,
    ) -> Result<file::Model, RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct SqlFileRepository {
    db: DatabaseConnection,
}

impl SqlFileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileRepository for SqlFileRepository {
    async fn get_by_id(&self, id: i32) -> Result<file::Model, RepositoryError> {
        file::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(
        &self,
        version_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<file::Model>, RepositoryError> {
        let mut query = file::Entity::find()
            .order_by_desc(file::Column::CreatedAt)
            .order_by_desc(file::Column::Id);
        if let Some(version_id) = version_id {
            query = query
                .inner_join(version_file::Entity)
                .filter(version_file::Column::VersionId.eq(version_id));
        }
        let total = query.clone().count(&self.db).await?;
        let items = query.limit(limit).offset(offset).all(&self.db).await?;
        Ok(Page { items, total })
    }

    async fn create(&self, name: String) -> Result<file::Model, RepositoryError> {
        let timestamp = now();
        let model = file::ActiveModel {
            name: Set(name),
            size: Set(None),
            path: Set(None),
            mime_type: Set(None),
            is_complete: Set(false),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn complete_upload(
        &self,
        id: i32,
        upload: CompletedUpload,
    ) -> Result<file::Model, RepositoryError> {
        let result = file::Entity::update_many()
            .col_expr(file::Column::Size, Expr::value(upload.size))
            .col_expr(file::Column::Path, Expr::value(upload.path))
            .col_expr(file::Column::MimeType, Expr::value(upload.mime_type))
            .col_expr(file::Column::IsComplete, Expr::value(true))
            .col_expr(file::Column::UpdatedAt, Expr::value(now()))
            .filter(file::Column::Id.eq(id))
            .filter(file::Column::IsComplete.eq(false))
            .exec(&self.db)
            .await?;

        let model = self.get_by_id(id).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::Conflict(format!(
                "file {id} has already been uploaded"
            )));
        }
        Ok(model)
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        version_file::Entity::delete_many()
            .filter(version_file::Column::FileId.eq(id))
            .exec(&txn)
            .await?;
        let result = file::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }
}
