use serde::{Deserialize, Serialize};

/// A photo taken during the session.
///
/// `raw_uri` points into platform temp storage. `composed_uri` is set only
/// once a watermark has been rendered; uploads fall back to `raw_uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPhoto {
    pub raw_uri: String,
    pub composed_uri: Option<String>,
}

impl CapturedPhoto {
    /// Returns `None` for an empty URI so a preview never holds an unusable photo.
    pub fn from_raw(raw_uri: impl Into<String>) -> Option<Self> {
        let raw_uri = raw_uri.into();
        if raw_uri.trim().is_empty() {
            return None;
        }
        Some(Self {
            raw_uri,
            composed_uri: None,
        })
    }

    pub fn with_composed(&self, composed_uri: impl Into<String>) -> Self {
        Self {
            raw_uri: self.raw_uri.clone(),
            composed_uri: Some(composed_uri.into()),
        }
    }

    /// The URI that should be uploaded: composed if available, raw otherwise.
    pub fn upload_uri(&self) -> &str {
        self.composed_uri.as_deref().unwrap_or(&self.raw_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_uri_is_rejected() {
        assert!(CapturedPhoto::from_raw("").is_none());
        assert!(CapturedPhoto::from_raw("   ").is_none());
    }

    #[test]
    fn upload_uri_prefers_composed() {
        let photo = CapturedPhoto::from_raw("file:///tmp/raw.jpg").unwrap();
        assert_eq!(photo.upload_uri(), "file:///tmp/raw.jpg");

        let composed = photo.with_composed("file:///tmp/composed.jpg");
        assert_eq!(composed.upload_uri(), "file:///tmp/composed.jpg");
        assert_eq!(composed.raw_uri, photo.raw_uri);
    }
}
