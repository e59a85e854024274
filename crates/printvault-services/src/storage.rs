//! Object-storage contract
//!
//! The validator runs before any storage write; asset references recorded in
//! the ledger are the keys produced by these writes. Production deployments
//! implement [`AssetStore`] over their object store; [`LocalAssetStore`] is a
//! filesystem backend for development and tests.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction for validated assets.
///
/// Only the operations the upload and entitlement paths consume: a write that
/// yields the `(storage_key, url)` pair recorded as an asset reference, and
/// the read/existence/delete primitives the retrieval path needs once
/// [`is_entitled`](crate::EntitlementService::is_entitled) has granted access.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload a file and return (storage_key, url). The storage_key is the
    /// asset reference a ledger entry records; the url is publicly servable.
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Delete a file by its storage key
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalAssetStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    /// Create a new LocalAssetStore rooted at `base_path`, serving files
    /// under `base_url` (e.g. "http://localhost:3000/assets").
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalAssetStore {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(storage_key))
    }

    fn generate_key(filename: &str) -> String {
        format!("assets/{}", filename)
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)> {
        let key = Self::generate_key(filename);
        let path = self.key_to_path(&key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", path.display(), e)))?;

        let url = self.generate_url(&key);
        Ok((key, url))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }
}
