//! HTTP submission sink.

use std::time::Duration;

use async_trait::async_trait;
use loanlens_core::models::{EvidenceSubmission, SubmissionReceipt};
use reqwest::Client;
use serde::Deserialize;

use super::{SinkError, SubmissionSink};

/// Authentication strategy for the submissions API.
#[derive(Clone, Debug)]
pub enum Auth {
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "submissionId")]
    id: String,
}

/// Posts evidence records as JSON to `{base_url}/submissions`.
#[derive(Clone, Debug)]
pub struct HttpSubmissionSink {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpSubmissionSink {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SinkError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, submission: &EvidenceSubmission) -> Result<SubmissionReceipt, SinkError> {
        let url = format!("{}/submissions", self.base_url);
        let request = self.apply_auth(self.client.post(&url).json(submission));

        let start = std::time::Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = status.as_u16(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Submission rejected"
            );
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            submission_id = %body.id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Evidence submission accepted"
        );

        Ok(SubmissionReceipt {
            submission_id: body.id,
            media_url: submission.media_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loanlens_core::models::{CaptureRequest, GeoFix};

    fn submission() -> EvidenceSubmission {
        EvidenceSubmission::photo(
            &CaptureRequest::default(),
            &GeoFix::new(12.97, 77.59, 1_700_000_000_000),
            "https://cdn.example.com/x.jpg",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn posts_json_with_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submissions")
            .match_header("x-api-key", "secret")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"mediaType":"photo","assetName":"Loan Evidence"}"#.to_string(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"sub-1"}"#)
            .create_async()
            .await;

        let sink =
            HttpSubmissionSink::new(format!("{}/", server.url()), Auth::XApiKey("secret".into()))
                .unwrap();
        let receipt = sink.submit(&submission()).await.unwrap();

        assert_eq!(receipt.submission_id, "sub-1");
        assert_eq!(receipt.media_url, "https://cdn.example.com/x.jpg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_is_rejected_with_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/submissions")
            .with_status(503)
            .with_body("sink unavailable")
            .create_async()
            .await;

        let sink = HttpSubmissionSink::new(server.url(), Auth::None).unwrap();
        let err = sink.submit(&submission()).await.unwrap_err();

        match err {
            SinkError::Rejected { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "sink unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn accepts_submission_id_alias() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/submissions")
            .with_status(200)
            .with_body(r#"{"submissionId":"sub-2"}"#)
            .create_async()
            .await;

        let sink = HttpSubmissionSink::new(server.url(), Auth::Bearer("t".into())).unwrap();
        assert_eq!(sink.submit(&submission()).await.unwrap().submission_id, "sub-2");
    }
}
