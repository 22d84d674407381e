use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob (or directory, for `list`/`walk`) exists under the key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The key is malformed or resolves outside of the storage root.
    #[error("invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// An I/O error occurred while performing `op` on `key`.
    #[error("storage {op} failed for '{key}': {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote object store rejected the request.
    #[error("object storage {op} failed for '{key}': {message}")]
    Backend {
        op: &'static str,
        key: String,
        message: String,
    },

    /// A `walk` visitor asked to stop.
    #[error("walk aborted: {0}")]
    Visit(Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, key: &str, source: std::io::Error) -> Self {
        if is_missing(&source) {
            return Self::NotFound(key.to_string());
        }
        Self::Io {
            op,
            key: key.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A path is missing when it, or one of its parents, does not exist as a
/// directory entry of the expected type (e.g. `a/b` where `a` is a file).
pub(crate) fn is_missing(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}
