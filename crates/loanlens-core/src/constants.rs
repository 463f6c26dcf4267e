//! Constants shared across the capture pipeline.

/// User id used when the session has no authenticated profile.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Asset name recorded when the capture is not tied to a named requirement.
pub const DEFAULT_ASSET_NAME: &str = "Loan Evidence";

/// Root prefix for evidence blobs: `{prefix}/{user_id}/{epoch_millis}.jpg`.
pub const EVIDENCE_KEY_PREFIX: &str = "loan-evidence";

/// Content type every evidence upload is tagged with.
pub const EVIDENCE_CONTENT_TYPE: &str = "image/jpeg";

/// File extension for composed and uploaded evidence.
pub const EVIDENCE_EXTENSION: &str = "jpg";

/// JPEG quality for composed evidence.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Shown when an upload error carries no message of its own.
pub const GENERIC_UPLOAD_FAILURE: &str = "Could not upload the evidence. Please retry.";
