//! LoanLens evidence capture pipeline
//!
//! Drives one capture session: permission acquisition, photo capture,
//! best-effort watermark composition, blob upload and submission of the
//! evidence record. Every device and remote service is an injected trait
//! object so the pipeline runs the same against real hardware, the desktop
//! bindings in the CLI, or the fakes in [`test_helpers`].

pub mod compose;
pub mod devices;
pub mod permissions;
pub mod pipeline;
pub mod sink;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export commonly used types
pub use compose::{Composer, WatermarkComposer};
pub use devices::{
    CameraDevice, CaptureOptions, DeviceError, DeviceResult, FsMediaStore, LocationProvider,
    MediaLibrary, MediaStore, RawPhoto,
};
pub use permissions::{Advisory, InitReport, PermissionCoordinator};
pub use pipeline::{CaptureOutcome, Collaborators, ConfirmOutcome, EvidencePipeline};
#[cfg(feature = "sink-http")]
pub use sink::http::{Auth, HttpSubmissionSink};
pub use sink::{DirectorySubmissionSink, SinkError, SubmissionSink};
