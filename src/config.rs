use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageProvider;

/// Default upload limit (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket_name: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub path: PathBuf,
    pub s3: Option<S3Config>,
}

impl StorageConfig {
    /// Read only the blob storage settings, for tools that never touch the
    /// database.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("STORAGE_PROVIDER") {
            Some(value) => value.parse::<StorageProvider>().map_err(|reason| {
                ConfigError::Invalid {
                    key: "STORAGE_PROVIDER",
                    reason,
                }
            })?,
            None => StorageProvider::Filesystem,
        };

        let path = PathBuf::from(lookup("STORAGE_PATH").unwrap_or_else(|| "./data".to_string()));

        let s3 = if provider == StorageProvider::S3 {
            Some(S3Config {
                bucket_name: lookup("S3_BUCKET_NAME").ok_or(ConfigError::Missing("S3_BUCKET_NAME"))?,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: lookup("S3_ENDPOINT"),
                access_key_id: lookup("AWS_ACCESS_KEY_ID")
                    .ok_or(ConfigError::Missing("AWS_ACCESS_KEY_ID"))?,
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY")
                    .ok_or(ConfigError::Missing("AWS_SECRET_ACCESS_KEY"))?,
            })
        } else {
            None
        };

        Ok(Self { provider, path, s3 })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_bind: String,
    pub server_port: u16,
    pub storage: StorageConfig,
    pub max_upload_size: usize,
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let server_bind = lookup("SERVER_BIND").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = match lookup("SERVER_PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "SERVER_PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let storage = StorageConfig::from_lookup(&lookup)?;

        let max_upload_size = match lookup("MAX_UPLOAD_SIZE") {
            Some(size) => size.parse::<usize>().map_err(|e| ConfigError::Invalid {
                key: "MAX_UPLOAD_SIZE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        Ok(Self {
            database_url,
            server_bind,
            server_port,
            storage,
            max_upload_size,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_bind, self.server_port)
    }
}
