//! Blob storage backends.
//!
//! Blobs are raw bytes addressed by backend-relative keys such as
//! `files/3f0c…`. Keys always use `/` as separator, never start with `/`
//! and never contain `..` segments; every backend validates them through
//! [`key_segments`] before touching the underlying store.

mod error;
pub mod filesystem;
pub mod s3;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::config::StorageConfig;

pub use error::StorageError;
pub use filesystem::FilesystemStorage;
pub use s3::S3Storage;

/// Name of the reserved directory holding in-flight writes.
pub const TEMP_DIR: &str = ".tmp";

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// A readable, seekable blob stream.
pub trait BlobReader: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> BlobReader for T {}

pub type BoxBlobReader = Box<dyn BlobReader>;

/// A blob found by `list` or `walk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub path: String,
    pub size: u64,
}

/// Visitor invoked by [`FileStorage::walk`]. Returning an error stops the walk.
pub type WalkFn<'a> = dyn FnMut(ObjectInfo) -> Result<(), StorageError> + Send + 'a;

/// Byte-level storage addressed by relative keys.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write everything from `reader` under `key`, replacing any previous
    /// content atomically. Returns the number of bytes written.
    async fn save(&self, key: &str, reader: BoxReader) -> Result<u64, StorageError>;

    /// Open the blob stored under `key`.
    async fn retrieve(&self, key: &str) -> Result<BoxBlobReader, StorageError>;

    /// Remove the blob stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List the blobs directly under `root` (not recursive, no directories).
    async fn list(&self, root: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Visit every blob below `root`, at any depth.
    async fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> Result<(), StorageError>;
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    Filesystem,
    S3,
}

impl FromStr for StorageProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" => Ok(Self::Filesystem),
            "s3" => Ok(Self::S3),
            other => Err(format!("unsupported storage provider '{other}'")),
        }
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => f.write_str("filesystem"),
            Self::S3 => f.write_str("s3"),
        }
    }
}

/// Build the configured storage backend.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn FileStorage>, StorageError> {
    match config.provider {
        StorageProvider::Filesystem => {
            let storage = FilesystemStorage::new(&config.path).await?;
            tracing::info!(root = %storage.root().display(), "using filesystem storage");
            Ok(Arc::new(storage))
        }
        StorageProvider::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| StorageError::Backend {
                op: "init",
                key: String::new(),
                message: "missing S3 configuration".into(),
            })?;
            tracing::info!(bucket = %s3.bucket_name, "using S3 storage");
            Ok(Arc::new(S3Storage::new(s3)))
        }
    }
}

/// Split `key` into validated segments. An empty result denotes the root.
pub fn key_segments(key: &str) -> Result<Vec<&str>, StorageError> {
    let invalid = |reason| StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    if key.starts_with('/') || key.starts_with('\\') {
        return Err(invalid("absolute keys are not allowed"));
    }

    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("parent directory segments are not allowed")),
            s if s.contains('\\') || s.contains('\0') => {
                return Err(invalid("backslashes and NUL bytes are not allowed"));
            }
            s => segments.push(s),
        }
    }

    if segments.first() == Some(&TEMP_DIR) {
        return Err(invalid("the temporary directory is reserved"));
    }

    Ok(segments)
}

/// Like [`key_segments`], but the key must name a blob rather than the root.
pub fn blob_key(key: &str) -> Result<String, StorageError> {
    let segments = key_segments(key)?;
    if segments.is_empty() {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty",
        });
    }
    Ok(segments.join("/"))
}

pub(crate) fn child_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
