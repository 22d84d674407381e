use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncSeek};
use uuid::Uuid;

use super::error::{ServiceError, required};
use super::mime;
use crate::entities::file;
use crate::repositories::{CompletedUpload, FileRepository, Page, RepositoryError};
use crate::storage::{BoxBlobReader, FileStorage, StorageError};

/// Prefix of every uploaded blob's storage key.
pub const CONTENT_PREFIX: &str = "files";

/// A fresh storage key for uploaded content. Never derived from the file name.
pub fn content_key() -> String {
    format!("{CONTENT_PREFIX}/{}", Uuid::new_v4())
}

/// Drives the two-phase file lifecycle: a metadata-only record is created
/// first, content is uploaded once, and deletion removes both.
#[derive(Clone)]
pub struct FileService {
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn FileStorage>,
}

impl FileService {
    pub fn new(files: Arc<dyn FileRepository>, storage: Arc<dyn FileStorage>) -> Self {
        Self { files, storage }
    }

    pub async fn get(&self, id: i32) -> Result<file::Model, ServiceError> {
        self.files
            .get_by_id(id)
            .await
            .map_err(ServiceError::from_repo("file"))
    }

    pub async fn list(
        &self,
        version_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<file::Model>, ServiceError> {
        self.files
            .list(version_id, limit, offset)
            .await
            .map_err(ServiceError::from_repo("file"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<file::Model, ServiceError> {
        let name = required("name", name)?;
        let file = self
            .files
            .create(name)
            .await
            .map_err(ServiceError::from_repo("file"))?;
        tracing::info!(file_id = file.id, "file record created");
        Ok(file)
    }

    /// Store `content` for an incomplete file and mark it complete.
    ///
    /// `declared_size` must match the number of bytes actually read.
    #[tracing::instrument(skip(self, content))]
    pub async fn upload<R>(
        &self,
        id: i32,
        mut content: R,
        declared_size: u64,
    ) -> Result<file::Model, ServiceError>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
    {
        let file = self.get(id).await?;
        if file.is_complete {
            return Err(ServiceError::AlreadyComplete);
        }

        let key = content_key();
        let mime_type = mime::sniff(&mut content)
            .await
            .map_err(|e| StorageError::io("sniff", &key, e))?;

        let written = self.storage.save(&key, Box::new(content)).await?;
        if written != declared_size {
            self.discard_blob(&key).await;
            return Err(ServiceError::Validation(format!(
                "declared size {declared_size} does not match the {written} bytes received"
            )));
        }
        let size = match i64::try_from(written) {
            Ok(size) => size,
            Err(_) => {
                self.discard_blob(&key).await;
                return Err(ServiceError::Validation("file is too large".into()));
            }
        };

        let upload = CompletedUpload {
            size,
            path: key.clone(),
            mime_type: mime_type.to_string(),
        };
        match self.files.complete_upload(id, upload).await {
            Ok(file) => {
                tracing::info!(size, mime_type, "file uploaded");
                Ok(file)
            }
            Err(err) => {
                self.discard_blob(&key).await;
                Err(match err {
                    RepositoryError::NotFound => ServiceError::NotFound("file"),
                    RepositoryError::Conflict(_) => ServiceError::AlreadyComplete,
                    RepositoryError::Db(e) => ServiceError::Database(e),
                })
            }
        }
    }

    /// Open the content of a completed file.
    pub async fn download(&self, id: i32) -> Result<(file::Model, BoxBlobReader), ServiceError> {
        let file = self.get(id).await?;
        let path = match (&file.path, file.is_complete) {
            (Some(path), true) => path.clone(),
            _ => return Err(ServiceError::NotComplete),
        };
        let content = self.storage.retrieve(&path).await?;
        Ok((file, content))
    }

    /// Remove the metadata record and then, if it had content, the blob.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let file = self.get(id).await?;
        self.files
            .delete(id)
            .await
            .map_err(ServiceError::from_repo("file"))?;

        if let (true, Some(path)) = (file.is_complete, file.path.as_deref()) {
            self.storage.delete(path).await?;
        }
        tracing::info!("file deleted");
        Ok(())
    }

    /// Best-effort removal of a blob no record points at.
    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::error!(key, error = %e, "failed to remove orphaned blob");
        }
    }
}
