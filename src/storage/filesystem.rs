use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::is_missing;
use super::{
    BoxBlobReader, BoxReader, FileStorage, ObjectInfo, StorageError, TEMP_DIR, WalkFn, blob_key,
    child_key, key_segments,
};

/// Stores blobs as plain files below a root directory.
///
/// Writes go to a uniquely named file in `<root>/.tmp` and are renamed into
/// place once fully flushed, so readers never observe a partial blob.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Open (and create, if needed) a storage rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        let display = root.display().to_string();

        fs::create_dir_all(root.join(TEMP_DIR))
            .await
            .map_err(|e| StorageError::io("init", &display, e))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|e| StorageError::io("init", &display, e))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn join(&self, segments: &[&str]) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(segments);
        path
    }

    /// Resolve `key` to an absolute path, refusing anything that escapes
    /// the root through symlinks.
    async fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let segments = key_segments(key)?;
        let path = self.join(&segments);
        self.ensure_confined(key, &path).await?;
        Ok(path)
    }

    async fn ensure_confined(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        let mut candidate = path.to_path_buf();
        loop {
            match fs::canonicalize(&candidate).await {
                Ok(real) if real.starts_with(&self.root) => return Ok(()),
                Ok(_) => break,
                Err(e) if is_missing(&e) => {
                    if !candidate.pop() {
                        break;
                    }
                }
                Err(e) => return Err(StorageError::io("resolve", key, e)),
            }
        }

        Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "resolves outside of the storage root",
        })
    }

    async fn create_temp(&self, key: &str) -> Result<(fs::File, TempPath), StorageError> {
        let temp_dir = self.root.join(TEMP_DIR);
        fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| StorageError::io("save", key, e))?;

        let named = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("blob-")
                .suffix(".tmp")
                .tempfile_in(temp_dir)
        })
        .await
        .map_err(|e| StorageError::io("save", key, io::Error::other(e)))?
        .map_err(|e| StorageError::io("save", key, e))?;

        let (file, temp_path) = named.into_parts();
        Ok((fs::File::from_std(file), temp_path))
    }
}

/// Remove an abandoned temp file. Failures are logged and swallowed.
fn discard(temp_path: TempPath, key: &str) {
    let path = temp_path.to_path_buf();
    if let Err(e) = temp_path.close() {
        tracing::warn!(key, path = %path.display(), error = %e, "failed to remove temporary file");
    }
}

async fn write_all(reader: &mut BoxReader, file: &mut fs::File) -> io::Result<u64> {
    let written = tokio::io::copy(reader, file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl FileStorage for FilesystemStorage {
    #[tracing::instrument(skip(self, reader))]
    async fn save(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        let key = blob_key(key)?;
        let path = self.resolve(&key).await?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("save", &key, e))?;
        }
        if fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(StorageError::InvalidKey {
                key,
                reason: "key names a directory",
            });
        }

        let (mut file, temp_path) = self.create_temp(&key).await?;
        let written = match write_all(&mut reader, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                discard(temp_path, &key);
                return Err(StorageError::io("save", &key, e));
            }
        };
        drop(file);

        let target = path.clone();
        let persisted = tokio::task::spawn_blocking(move || temp_path.persist(target))
            .await
            .map_err(|e| StorageError::io("save", &key, io::Error::other(e)))?;
        if let Err(e) = persisted {
            discard(e.path, &key);
            return Err(StorageError::io("save", &key, e.error));
        }

        tracing::debug!(bytes = written, "blob saved");
        Ok(written)
    }

    async fn retrieve(&self, key: &str) -> Result<BoxBlobReader, StorageError> {
        let key = blob_key(key)?;
        let path = self.resolve(&key).await?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::io("retrieve", &key, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key));
        }

        let file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::io("retrieve", &key, e))?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = blob_key(key)?;
        let path = self.resolve(&key).await?;

        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| StorageError::io("delete", &key, e))?;
        if metadata.is_dir() {
            return Err(StorageError::NotFound(key));
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io("delete", &key, e))
    }

    async fn list(&self, root: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let prefix = key_segments(root)?.join("/");
        let dir = self.resolve(&prefix).await?;
        let is_root = prefix.is_empty();

        let metadata = fs::metadata(&dir)
            .await
            .map_err(|e| StorageError::io("list", root, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotFound(root.to_string()));
        }

        let mut objects = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::io("list", root, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("list", root, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_root && name == TEMP_DIR {
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io("list", root, e))?;
            if !file_type.is_file() {
                continue;
            }
            let size = entry
                .metadata()
                .await
                .map_err(|e| StorageError::io("list", root, e))?
                .len();
            objects.push(ObjectInfo {
                path: child_key(&prefix, &name),
                size,
            });
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    async fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let prefix = key_segments(root)?.join("/");
        let start = self.resolve(&prefix).await?;

        let metadata = fs::metadata(&start)
            .await
            .map_err(|e| StorageError::io("walk", root, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotFound(root.to_string()));
        }

        // (relative key, absolute path); popped in sorted order
        let mut pending = vec![(prefix, start)];
        while let Some((dir_key, dir)) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::io("walk", &dir_key, e))?;

            let mut files = Vec::new();
            let mut dirs = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io("walk", &dir_key, e))?
            {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if dir_key.is_empty() && name == TEMP_DIR {
                    continue;
                }
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::io("walk", &dir_key, e))?;
                let key = child_key(&dir_key, &name);
                if file_type.is_dir() {
                    dirs.push((key, entry.path()));
                } else if file_type.is_file() {
                    let size = entry
                        .metadata()
                        .await
                        .map_err(|e| StorageError::io("walk", &key, e))?
                        .len();
                    files.push(ObjectInfo { path: key, size });
                }
            }

            files.sort_by(|a, b| a.path.cmp(&b.path));
            for info in files {
                visit(info)?;
            }

            dirs.sort_by(|a, b| b.0.cmp(&a.0));
            pending.extend(dirs);
        }

        Ok(())
    }
}
