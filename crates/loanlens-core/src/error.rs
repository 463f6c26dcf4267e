//! Error types module
//!
//! `CaptureError` is what the evidence pipeline returns to its caller. Only
//! the variants that a user must act on reach the caller at all: composition,
//! gallery and media-permission failures are swallowed inside the pipeline
//! and only logged.

use crate::constants::GENERIC_UPLOAD_FAILURE;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a repeated tap
    Debug,
    /// Warning level - for recoverable issues the user can fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be presented to the person holding the device.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the error should raise an alert at all
    fn is_user_visible(&self) -> bool;

    /// Alert title
    fn alert_title(&self) -> &'static str;

    /// Alert body
    fn client_message(&self) -> String;

    /// Whether the same operation can be retried without restarting the session
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    CameraPermissionDenied,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Location required before evidence can be submitted")]
    LocationRequired,

    /// Carries the user-facing reason as is.
    #[error("{0}")]
    UploadFailed(String),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl CaptureError {
    /// Upload failure carrying `message`, or the generic retry text when it is blank.
    pub fn upload(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            CaptureError::UploadFailed(GENERIC_UPLOAD_FAILURE.to_string())
        } else {
            CaptureError::UploadFailed(message)
        }
    }
}

impl ErrorMetadata for CaptureError {
    fn error_code(&self) -> &'static str {
        match self {
            CaptureError::CameraPermissionDenied => "CAMERA_PERMISSION_DENIED",
            CaptureError::CaptureFailed(_) => "CAPTURE_FAILED",
            CaptureError::LocationRequired => "LOCATION_REQUIRED",
            CaptureError::UploadFailed(_) => "UPLOAD_FAILED",
            CaptureError::InvalidState { .. } => "INVALID_STATE",
        }
    }

    fn is_user_visible(&self) -> bool {
        !matches!(self, CaptureError::InvalidState { .. })
    }

    fn alert_title(&self) -> &'static str {
        match self {
            CaptureError::CameraPermissionDenied => "Camera permission required",
            CaptureError::CaptureFailed(_) => "Camera error",
            CaptureError::LocationRequired => "Location needed",
            CaptureError::UploadFailed(_) => "Upload failed",
            CaptureError::InvalidState { .. } => "Action unavailable",
        }
    }

    fn client_message(&self) -> String {
        match self {
            CaptureError::CameraPermissionDenied => {
                "Camera permission is required to capture evidence.".to_string()
            }
            CaptureError::CaptureFailed(_) => {
                "Unable to capture photo. Please try again.".to_string()
            }
            CaptureError::LocationRequired => {
                "Grant location access to embed GPS on the photo.".to_string()
            }
            CaptureError::UploadFailed(message) => message.clone(),
            CaptureError::InvalidState { .. } => self.to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn log_level(&self) -> LogLevel {
        match self {
            CaptureError::InvalidState { .. } => LogLevel::Debug,
            CaptureError::CameraPermissionDenied | CaptureError::LocationRequired => LogLevel::Warn,
            CaptureError::CaptureFailed(_) | CaptureError::UploadFailed(_) => LogLevel::Error,
        }
    }
}
