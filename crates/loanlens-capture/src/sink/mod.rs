//! Submission sinks: the remote append-only store of evidence records.

mod directory;
#[cfg(feature = "sink-http")]
pub mod http;

pub use directory::DirectorySubmissionSink;

use async_trait::async_trait;
use loanlens_core::models::{EvidenceSubmission, SubmissionReceipt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid sink response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, submission: &EvidenceSubmission) -> Result<SubmissionReceipt, SinkError>;
}
