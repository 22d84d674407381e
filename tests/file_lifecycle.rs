mod common;

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use docport::entities::file;
use docport::repositories::{
    CompletedUpload, FileRepository, Page, RepositoryError, SqlFileRepository,
};
use docport::services::{FileService, ServiceError};
use docport::storage::FileStorage;
use tokio::io::AsyncReadExt;

use common::TestEnv;

fn content(data: &[u8]) -> Cursor<Vec<u8>> {
    Cursor::new(data.to_vec())
}

async fn read_download(service: &FileService, id: i32) -> Vec<u8> {
    let (_, mut stream) = service.download(id).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn create_upload_download_delete() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let created = files.create("a.pdf").await.unwrap();
    let fetched = files.get(created.id).await.unwrap();
    assert!(!fetched.is_complete);
    assert_eq!(fetched.size, None);
    assert_eq!(fetched.path, None);
    assert_eq!(fetched.mime_type, None);

    let body = b"hello, world!";
    let uploaded = files
        .upload(created.id, content(body), body.len() as u64)
        .await
        .unwrap();
    assert!(uploaded.is_complete);
    assert_eq!(uploaded.size, Some(13));
    assert_eq!(uploaded.mime_type.as_deref(), Some("text/plain; charset=utf-8"));
    let path = uploaded.path.clone().unwrap();
    assert!(path.starts_with("files/"));
    assert_ne!(path, "files/a.pdf");

    let fetched = files.get(created.id).await.unwrap();
    assert_eq!(fetched, uploaded);
    assert_eq!(read_download(&files, created.id).await, body);

    files.delete(created.id).await.unwrap();
    assert!(matches!(
        files.get(created.id).await,
        Err(ServiceError::NotFound("file"))
    ));
    assert!(matches!(
        files.download(created.id).await,
        Err(ServiceError::NotFound("file"))
    ));
    assert!(env.blobs().await.is_empty());
}

#[tokio::test]
async fn empty_upload_round_trips() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let created = files.create("empty.txt").await.unwrap();
    let uploaded = files.upload(created.id, content(b""), 0).await.unwrap();

    assert_eq!(uploaded.size, Some(0));
    assert!(read_download(&files, created.id).await.is_empty());
}

#[tokio::test]
async fn upload_detects_mime_without_consuming_content() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let pdf = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";
    let created = files.create("report").await.unwrap();
    let uploaded = files
        .upload(created.id, content(pdf), pdf.len() as u64)
        .await
        .unwrap();

    assert_eq!(uploaded.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(read_download(&files, created.id).await, pdf);
}

#[tokio::test]
async fn second_upload_is_rejected_and_leaves_content_untouched() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let created = files.create("doc.txt").await.unwrap();
    let first = files.upload(created.id, content(b"first"), 5).await.unwrap();

    let result = files.upload(created.id, content(b"second!"), 7).await;
    assert!(matches!(result, Err(ServiceError::AlreadyComplete)));

    assert_eq!(files.get(created.id).await.unwrap(), first);
    assert_eq!(read_download(&files, created.id).await, b"first");
    assert_eq!(env.blobs().await.len(), 1);
}

#[tokio::test]
async fn concurrent_uploads_complete_exactly_once() {
    let env = TestEnv::new().await;
    let files = env.state().files;
    let created = files.create("race.txt").await.unwrap();

    let (a, b) = tokio::join!(
        files.upload(created.id, content(b"aaaa"), 4),
        files.upload(created.id, content(b"bbbb"), 4),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ServiceError::AlreadyComplete))));

    let blobs = env.blobs().await;
    assert_eq!(blobs.len(), 1);
    let stored = files.get(created.id).await.unwrap();
    assert_eq!(stored.path.as_deref(), Some(blobs[0].path.as_str()));
}

#[tokio::test]
async fn download_before_upload_is_not_complete() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let created = files.create("pending.bin").await.unwrap();

    assert!(matches!(
        files.download(created.id).await,
        Err(ServiceError::NotComplete)
    ));
}

#[tokio::test]
async fn upload_to_missing_file_is_not_found() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    let result = files.upload(404, content(b"data"), 4).await;

    assert!(matches!(result, Err(ServiceError::NotFound("file"))));
    assert!(env.blobs().await.is_empty());
}

#[tokio::test]
async fn size_mismatch_discards_the_blob() {
    let env = TestEnv::new().await;
    let files = env.state().files;
    let created = files.create("short.txt").await.unwrap();

    let result = files.upload(created.id, content(b"abc"), 10).await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert!(!files.get(created.id).await.unwrap().is_complete);
    assert!(env.blobs().await.is_empty());
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let env = TestEnv::new().await;
    let files = env.state().files;

    assert!(matches!(
        files.create("   ").await,
        Err(ServiceError::Validation(_))
    ));
}

#[tokio::test]
async fn deleting_an_incomplete_file_only_removes_metadata() {
    let env = TestEnv::new().await;
    let files = env.state().files;
    let created = files.create("draft").await.unwrap();

    files.delete(created.id).await.unwrap();

    assert!(matches!(
        files.delete(created.id).await,
        Err(ServiceError::NotFound("file"))
    ));
}

/// Delegates to the real repository but fails every completion.
struct BrokenCompletion(SqlFileRepository);

#[async_trait]
impl FileRepository for BrokenCompletion {
    async fn get_by_id(&self, id: i32) -> Result<file::Model, RepositoryError> {
        self.0.get_by_id(id).await
    }

    async fn list(
        &self,
        version_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<Page<file::Model>, RepositoryError> {
        self.0.list(version_id, limit, offset).await
    }

    async fn create(&self, name: String) -> Result<file::Model, RepositoryError> {
        self.0.create(name).await
    }

    async fn complete_upload(
        &self,
        _id: i32,
        _upload: CompletedUpload,
    ) -> Result<file::Model, RepositoryError> {
        Err(RepositoryError::Db(sea_orm::DbErr::Custom(
            "connection lost".into(),
        )))
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        self.0.delete(id).await
    }
}

#[tokio::test]
async fn failed_metadata_update_removes_the_written_blob() {
    let env = TestEnv::new().await;
    let repo = Arc::new(BrokenCompletion(SqlFileRepository::new(env.db.clone())));
    let files = FileService::new(repo, env.storage.clone());
    let created = files.create("doomed.txt").await.unwrap();

    let result = files.upload(created.id, content(b"payload"), 7).await;

    assert!(matches!(result, Err(ServiceError::Database(_))));
    assert!(env.blobs().await.is_empty());
    assert!(!files.get(created.id).await.unwrap().is_complete);
}

#[tokio::test]
async fn deleting_a_file_whose_blob_vanished_reports_the_storage_error() {
    let env = TestEnv::new().await;
    let files = env.state().files;
    let created = files.create("gone.txt").await.unwrap();
    let uploaded = files.upload(created.id, content(b"bytes"), 5).await.unwrap();
    env.storage.delete(uploaded.path.as_deref().unwrap()).await.unwrap();

    let result = files.delete(created.id).await;

    assert!(matches!(result, Err(ServiceError::Storage(e)) if e.is_not_found()));
    assert!(matches!(
        files.get(created.id).await,
        Err(ServiceError::NotFound("file"))
    ));
}

#[tokio::test]
async fn listing_is_newest_first_with_total() {
    let env = TestEnv::new().await;
    let files = env.state().files;
    for name in ["one", "two", "three"] {
        files.create(name).await.unwrap();
    }

    let page = files.list(None, 2, 0).await.unwrap();

    assert_eq!(page.total, 3);
    let names: Vec<_> = page.items.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["three", "two"]);
}
