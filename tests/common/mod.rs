#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use docport::routes::create_routes;
use docport::state::AppState;
use docport::storage::{FileStorage, FilesystemStorage, ObjectInfo, StorageError};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

pub const MAX_UPLOAD_SIZE: usize = 1024 * 1024;

/// A migrated SQLite database and a filesystem store, both in one temp dir.
pub struct TestEnv {
    pub dir: TempDir,
    pub db: DatabaseConnection,
    pub storage: Arc<FilesystemStorage>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("docport.db").display());

        let mut options = ConnectOptions::new(url);
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let storage = Arc::new(FilesystemStorage::new(dir.path().join("blobs")).await.unwrap());

        Self { dir, db, storage }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.db.clone(), self.storage.clone(), MAX_UPLOAD_SIZE)
    }

    pub fn router(&self) -> Router {
        create_routes(self.state())
    }

    /// Every blob currently stored, at any depth.
    pub async fn blobs(&self) -> Vec<ObjectInfo> {
        let mut found = Vec::new();
        let mut visit = |info: ObjectInfo| -> Result<(), StorageError> {
            found.push(info);
            Ok(())
        };
        self.storage.walk("", &mut visit).await.unwrap();
        found
    }
}
