//! Domain models for the evidence capture pipeline.

pub mod location;
pub mod permission;
pub mod photo;
pub mod request;
pub mod state;
pub mod submission;

pub use location::{GeoFix, LocationStatus};
pub use permission::{PermissionState, PermissionStatus};
pub use photo::CapturedPhoto;
pub use request::{CaptureRequest, SessionContext};
pub use state::PipelineState;
pub use submission::{EvidenceSubmission, MediaType, SubmissionLocation, SubmissionReceipt};
