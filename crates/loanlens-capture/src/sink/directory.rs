use std::path::PathBuf;

use async_trait::async_trait;
use loanlens_core::models::{EvidenceSubmission, SubmissionReceipt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{SinkError, SubmissionSink};

/// Append-only sink writing one `{submission_id}.json` per record.
///
/// Records are created with `create_new`, so an existing submission is never
/// overwritten.
#[derive(Clone, Debug)]
pub struct DirectorySubmissionSink {
    dir: PathBuf,
}

impl DirectorySubmissionSink {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn record_path(&self, submission_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", submission_id))
    }
}

#[async_trait]
impl SubmissionSink for DirectorySubmissionSink {
    async fn submit(&self, submission: &EvidenceSubmission) -> Result<SubmissionReceipt, SinkError> {
        let submission_id = Uuid::new_v4().to_string();
        let path = self.record_path(&submission_id);
        let body = serde_json::to_vec_pretty(submission)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&body).await?;
        file.sync_all().await?;

        tracing::info!(
            submission_id = %submission_id,
            path = %path.display(),
            "Evidence submission recorded"
        );

        Ok(SubmissionReceipt {
            submission_id,
            media_url: submission.media_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loanlens_core::models::{CaptureRequest, GeoFix};

    #[tokio::test]
    async fn writes_one_record_per_submission() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = DirectorySubmissionSink::new(dir.path()).await.unwrap();
        let submission = EvidenceSubmission::photo(
            &CaptureRequest::default(),
            &GeoFix::new(12.97, 77.59, 1_700_000_000_000),
            "http://localhost/x.jpg",
            Utc::now(),
        );

        let first = sink.submit(&submission).await.unwrap();
        let second = sink.submit(&submission).await.unwrap();
        assert_ne!(first.submission_id, second.submission_id);
        assert_eq!(first.media_url, "http://localhost/x.jpg");

        let stored = tokio::fs::read(sink.record_path(&first.submission_id))
            .await
            .unwrap();
        let parsed: EvidenceSubmission = serde_json::from_slice(&stored).unwrap();
        assert_eq!(parsed, submission);
    }
}
