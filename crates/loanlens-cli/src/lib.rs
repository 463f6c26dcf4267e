//! Desktop bindings for running a capture session from a terminal.

pub mod devices;

use std::sync::Arc;

use anyhow::Context;
use loanlens_capture::{Auth, DirectorySubmissionSink, HttpSubmissionSink, SubmissionSink};
use loanlens_core::Config;

/// HTTP sink when `SUBMISSION_API_URL` is set, otherwise the directory sink.
pub async fn create_sink(config: &Config) -> anyhow::Result<Arc<dyn SubmissionSink>> {
    if let Some(url) = &config.submission_api_url {
        let auth = config
            .submission_api_key
            .clone()
            .map(Auth::XApiKey)
            .unwrap_or(Auth::None);
        let sink = HttpSubmissionSink::new(url.clone(), auth)?;
        return Ok(Arc::new(sink));
    }

    let dir = config
        .submission_dir
        .clone()
        .context("Either SUBMISSION_API_URL or SUBMISSION_DIR must be set")?;
    let sink = DirectorySubmissionSink::new(dir).await?;
    Ok(Arc::new(sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_requires_a_destination() {
        let config = Config {
            submission_api_url: None,
            submission_dir: None,
            ..Config::default()
        };
        assert!(create_sink(&config).await.is_err());
    }

    #[tokio::test]
    async fn directory_sink_is_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            submission_dir: Some(dir.path().join("records")),
            ..Config::default()
        };
        create_sink(&config).await.unwrap();
        assert!(dir.path().join("records").is_dir());
    }
}
