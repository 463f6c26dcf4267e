use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::GeoFix;
use super::request::CaptureRequest;
use crate::constants::DEFAULT_ASSET_NAME;

/// Media kinds the submission sink accepts from this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubmissionLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Record written to the submission sink after a successful upload.
///
/// Built once per upload and never mutated; the sink owns it after acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSubmission {
    pub asset_name: String,
    pub media_type: MediaType,
    pub captured_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub location: SubmissionLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub media_url: String,
    pub thumbnail_url: String,
}

impl EvidenceSubmission {
    pub fn photo(
        request: &CaptureRequest,
        fix: &GeoFix,
        media_url: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let media_url = media_url.into();
        Self {
            asset_name: request
                .requirement_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_ASSET_NAME.to_string()),
            media_type: MediaType::Photo,
            captured_at: fix.captured_at(),
            submitted_at,
            location: SubmissionLocation {
                latitude: fix.latitude,
                longitude: fix.longitude,
            },
            remarks: request
                .requirement_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|id| format!("Requirement: {}", id)),
            thumbnail_url: media_url.clone(),
            media_url,
        }
    }
}

/// Acknowledgement returned by the sink once a submission is durably recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submission_id: String,
    pub media_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionContext;
    use chrono::TimeZone;

    #[test]
    fn photo_submission_fields() {
        let request = CaptureRequest::new(&SessionContext::new("u1"))
            .with_requirement(Some("R-7".into()), Some("Shop Photo".into()));
        let fix = GeoFix::new(12.97, 77.59, 1_700_000_000_000);
        let submitted_at = Utc.with_ymd_and_hms(2023, 11, 15, 8, 0, 0).unwrap();

        let submission =
            EvidenceSubmission::photo(&request, &fix, "https://cdn/x.jpg", submitted_at);

        assert_eq!(submission.asset_name, "Shop Photo");
        assert_eq!(submission.media_type, MediaType::Photo);
        assert_eq!(submission.captured_at, fix.captured_at());
        assert_eq!(submission.submitted_at, submitted_at);
        assert_eq!(submission.remarks.as_deref(), Some("Requirement: R-7"));
        assert_eq!(submission.media_url, "https://cdn/x.jpg");
        assert_eq!(submission.thumbnail_url, submission.media_url);
    }

    #[test]
    fn defaults_without_requirement() {
        let request = CaptureRequest::default();
        let fix = GeoFix::new(1.0, 2.0, 0);
        let submission = EvidenceSubmission::photo(&request, &fix, "u", Utc::now());

        assert_eq!(submission.asset_name, "Loan Evidence");
        assert!(submission.remarks.is_none());

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["mediaType"], "photo");
        assert_eq!(json["capturedAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("remarks").is_none());
        assert_eq!(json["location"]["latitude"], 1.0);
    }
}
