//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reference to a blob that has been written to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Storage abstraction trait
///
/// The capture pipeline only needs "put bytes under a key" and "give me a URL
/// anyone can resolve"; backends add reads for tooling and tests.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data under `storage_key`, tagged with `content_type`.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<BlobHandle>;

    /// Publicly resolvable URL for an uploaded blob.
    async fn public_url(&self, handle: &BlobHandle) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
