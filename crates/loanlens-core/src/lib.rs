//! LoanLens Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by every LoanLens component: the capture pipeline, storage backends, the
//! watermark renderer and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{CaptureError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
