//! LoanLens Storage Library
//!
//! Blob storage abstraction for evidence uploads, with S3 and local
//! filesystem implementations.
//!
//! # Storage key format
//!
//! Evidence keys are namespaced by user and capture time:
//!
//! - `{prefix}/{user_id}/{epoch_millis}.jpg` (prefix defaults to `loan-evidence`)
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::evidence_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use loanlens_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{BlobHandle, Storage, StorageError, StorageResult};
