use std::io::Cursor;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncReadExt;

use super::{
    BoxBlobReader, BoxReader, FileStorage, ObjectInfo, StorageError, WalkFn, blob_key,
    key_segments,
};
use crate::config::S3Config;

/// Stores blobs as objects in an S3 compatible bucket.
///
/// Object keys are the storage keys, so `list` and `walk` map onto
/// `ListObjectsV2` with and without a `/` delimiter.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket_name: String,
}

fn backend(op: &'static str, key: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        op,
        key: key.to_string(),
        message: err.to_string(),
    }
}

fn directory_prefix(root: &str) -> Result<String, StorageError> {
    let prefix = key_segments(root)?.join("/");
    if prefix.is_empty() {
        Ok(prefix)
    } else {
        Ok(format!("{prefix}/"))
    }
}

impl S3Storage {
    pub fn new(config: &S3Config) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "docport",
        );

        let region = aws_sdk_s3::config::Region::new(config.region.clone());

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket_name: config.bucket_name.clone(),
        }
    }

    /// Page through `ListObjectsV2`, handing each object under `prefix` to
    /// `visit`. With `delimiter` set, only direct children are returned.
    async fn for_each_object(
        &self,
        prefix: &str,
        delimiter: bool,
        visit: &mut WalkFn<'_>,
    ) -> Result<(), StorageError> {
        let mut continuation: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .prefix(prefix);
            if delimiter {
                request = request.delimiter("/");
            }
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let page = request
                .send()
                .await
                .map_err(|e| backend("list", prefix, e.into_service_error()))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if key.ends_with('/') {
                    continue;
                }
                visit(ObjectInfo {
                    path: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                })?;
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    #[tracing::instrument(skip(self, reader), fields(bucket = %self.bucket_name))]
    async fn save(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        let key = blob_key(key)?;

        // PutObject needs a known length; objects become visible only once
        // the request completes, which keeps readers off partial uploads.
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| StorageError::io("save", &key, e))?;
        let written = data.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| backend("save", &key, e.into_service_error()))?;

        Ok(written)
    }

    async fn retrieve(&self, key: &str) -> Result<BoxBlobReader, StorageError> {
        let key = blob_key(key)?;

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    StorageError::NotFound(key.clone())
                } else {
                    backend("retrieve", &key, err)
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| backend("retrieve", &key, e))?;

        Ok(Box::new(Cursor::new(data.into_bytes().to_vec())))
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket_name))]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = blob_key(key)?;

        // DeleteObject succeeds for missing keys, so check first.
        self.client
            .head_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_not_found() {
                    StorageError::NotFound(key.clone())
                } else {
                    backend("delete", &key, err)
                }
            })?;

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| backend("delete", &key, e.into_service_error()))?;

        Ok(())
    }

    async fn list(&self, root: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let prefix = directory_prefix(root)?;
        let mut objects = Vec::new();
        let mut collect = |info: ObjectInfo| -> Result<(), StorageError> {
            objects.push(info);
            Ok(())
        };
        self.for_each_object(&prefix, true, &mut collect).await?;
        Ok(objects)
    }

    async fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let prefix = directory_prefix(root)?;
        self.for_each_object(&prefix, false, visit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_prefix_appends_separator() {
        assert_eq!(directory_prefix("").unwrap(), "");
        assert_eq!(directory_prefix("files").unwrap(), "files/");
        assert_eq!(directory_prefix("files/a/").unwrap(), "files/a/");
        assert!(directory_prefix("../x").is_err());
    }
}
