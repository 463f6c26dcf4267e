//! Evidence pipeline state machine
//!
//! One pipeline drives one capture session for one [`CaptureRequest`]:
//!
//! ```text
//! AwaitingPermissions → Ready → Capturing → PreviewReady → Uploading → Completed
//!                        ↑                      │   ↑           │
//!                        └──── retake() ────────┘   └─ Failed ──┘
//! ```
//!
//! Every transition is published to [`EvidencePipeline::subscribe`]
//! receivers. `capture()` and `confirm()` share an atomic in-flight flag, so
//! a second trigger while one is running returns `Ignored` instead of taking
//! a second photo or submitting twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use loanlens_core::constants::{EVIDENCE_CONTENT_TYPE, EVIDENCE_KEY_PREFIX};
use loanlens_core::models::{
    CaptureRequest, CapturedPhoto, EvidenceSubmission, GeoFix, LocationStatus, PermissionState,
    PermissionStatus, PipelineState, SubmissionReceipt,
};
use loanlens_core::CaptureError;
use loanlens_storage::{evidence_key, Storage, StorageError};
use tokio::sync::broadcast;

use crate::compose::Composer;
use crate::devices::{
    CameraDevice, CaptureOptions, DeviceError, LocationProvider, MediaLibrary, MediaStore,
};
use crate::permissions::{InitReport, PermissionCoordinator};
use crate::sink::{SinkError, SubmissionSink};

const EVENT_CAPACITY: usize = 64;

/// Failure somewhere between reading the final photo and the sink's receipt.
#[derive(Debug, thiserror::Error)]
enum SubmitError {
    #[error(transparent)]
    Read(#[from] DeviceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl SubmitError {
    fn stage(&self) -> &'static str {
        match self {
            SubmitError::Read(_) => "read",
            SubmitError::Storage(_) => "storage",
            SubmitError::Sink(_) => "sink",
        }
    }
}

/// Everything the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub camera: Arc<dyn CameraDevice>,
    pub media_library: Arc<dyn MediaLibrary>,
    pub location: Arc<dyn LocationProvider>,
    pub media_store: Arc<dyn MediaStore>,
    pub storage: Arc<dyn Storage>,
    pub sink: Arc<dyn SubmissionSink>,
    pub composer: Arc<dyn Composer>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured {
        photo: CapturedPhoto,
        fix: Option<GeoFix>,
    },
    /// Another capture or confirm was already running.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Completed {
        receipt: SubmissionReceipt,
        submission: EvidenceSubmission,
        /// The photo whose bytes were uploaded; `composed_uri` is unset when
        /// composition fell back to the raw capture.
        uploaded_photo: CapturedPhoto,
    },
    /// Another capture or confirm was already running.
    Ignored,
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EvidencePipeline {
    request: CaptureRequest,
    permissions: PermissionCoordinator,
    camera: Arc<dyn CameraDevice>,
    media_store: Arc<dyn MediaStore>,
    storage: Arc<dyn Storage>,
    sink: Arc<dyn SubmissionSink>,
    composer: Arc<dyn Composer>,
    key_prefix: String,
    state: Mutex<PipelineState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<PipelineState>,
}

impl EvidencePipeline {
    pub fn new(request: CaptureRequest, collaborators: Collaborators) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            request,
            permissions: PermissionCoordinator::new(
                collaborators.camera.clone(),
                collaborators.media_library,
                collaborators.location,
            ),
            camera: collaborators.camera,
            media_store: collaborators.media_store,
            storage: collaborators.storage,
            sink: collaborators.sink,
            composer: collaborators.composer,
            key_prefix: EVIDENCE_KEY_PREFIX.to_string(),
            state: Mutex::new(PipelineState::AwaitingPermissions),
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    /// Receive every state transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineState> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.lock_state().clone()
    }

    pub fn permissions(&self) -> PermissionState {
        self.permissions.permissions()
    }

    pub fn current_fix(&self) -> Option<GeoFix> {
        self.permissions.current_fix()
    }

    pub fn location_status(&self) -> LocationStatus {
        self.permissions.location_status()
    }

    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: PipelineState) {
        let previous = std::mem::replace(&mut *self.lock_state(), next.clone());
        tracing::info!(
            from = previous.name(),
            to = next.name(),
            user_id = %self.request.user_id,
            "Pipeline state changed"
        );
        self.publish(next);
    }

    fn publish(&self, state: PipelineState) {
        // No receivers is fine.
        let _ = self.events.send(state);
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn invalid(operation: &'static str, state: &PipelineState) -> CaptureError {
        CaptureError::InvalidState {
            operation,
            state: state.name(),
        }
    }

    /// Run the start-of-session permission sweep. Leaves
    /// `AwaitingPermissions` only when the camera is granted.
    pub async fn initialize(&self) -> Result<InitReport, CaptureError> {
        let state = self.state();
        if !matches!(state, PipelineState::AwaitingPermissions) {
            return Err(Self::invalid("initialize", &state));
        }

        let report = self.permissions.initialize().await;
        if !report.camera_blocked() {
            self.transition(PipelineState::Ready);
        }
        Ok(report)
    }

    /// Ask for the camera again after a denial.
    pub async fn request_camera_permission(&self) -> Result<PermissionStatus, CaptureError> {
        let state = self.state();
        if !matches!(state, PipelineState::AwaitingPermissions) {
            return Err(Self::invalid("request camera permission", &state));
        }

        let status = self.permissions.request_camera_permission().await;
        if status.is_granted() {
            self.transition(PipelineState::Ready);
        }
        Ok(status)
    }

    /// Take one photo and move to `PreviewReady`.
    ///
    /// Gallery save and the location refresh are best effort. A capture
    /// failure leaves the pipeline in `Ready`.
    pub async fn capture(&self) -> Result<CaptureOutcome, CaptureError> {
        let Some(_in_flight) = self.try_begin() else {
            tracing::debug!("Capture ignored: operation already in flight");
            return Ok(CaptureOutcome::Ignored);
        };

        match self.state() {
            PipelineState::Ready => self.transition(PipelineState::Capturing),
            PipelineState::AwaitingPermissions if !self.permissions().camera.is_granted() => {
                return Err(CaptureError::CameraPermissionDenied);
            }
            other => return Err(Self::invalid("capture", &other)),
        }

        let photo = match self.camera.take_photo(CaptureOptions::default()).await {
            Ok(raw) => match CapturedPhoto::from_raw(raw.uri) {
                Some(photo) => photo,
                None => {
                    self.transition(PipelineState::Ready);
                    return Err(CaptureError::CaptureFailed(
                        "Camera returned an empty photo URI".to_string(),
                    ));
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to take photo");
                self.transition(PipelineState::Ready);
                return Err(CaptureError::CaptureFailed(e.to_string()));
            }
        };

        self.permissions.save_to_gallery(&photo.raw_uri).await;
        let fix = self.permissions.ensure_location().await;

        tracing::info!(
            raw_uri = %photo.raw_uri,
            has_fix = fix.is_some(),
            "Photo captured"
        );
        self.transition(PipelineState::PreviewReady {
            photo: photo.clone(),
        });

        Ok(CaptureOutcome::Captured { photo, fix })
    }

    /// Discard the preview and go back to `Ready`.
    pub fn retake(&self) -> Result<(), CaptureError> {
        let state = self.state();
        match state {
            PipelineState::PreviewReady { photo } => {
                tracing::debug!(raw_uri = %photo.raw_uri, "Discarding captured photo");
                self.transition(PipelineState::Ready);
                Ok(())
            }
            other => Err(Self::invalid("retake", &other)),
        }
    }

    /// Upload the previewed photo and submit the evidence record.
    ///
    /// Without an obtainable fix this returns `LocationRequired` and the
    /// preview stays as it is. Any upload, URL or sink failure publishes
    /// `Failed`, then restores the same preview so the user can confirm again.
    pub async fn confirm(&self) -> Result<ConfirmOutcome, CaptureError> {
        let Some(_in_flight) = self.try_begin() else {
            tracing::debug!("Confirm ignored: operation already in flight");
            return Ok(ConfirmOutcome::Ignored);
        };

        let photo = match self.state() {
            PipelineState::PreviewReady { photo } => photo,
            other => return Err(Self::invalid("confirm", &other)),
        };

        let fix = match self.permissions.current_fix() {
            Some(fix) => fix,
            None => match self.permissions.ensure_location().await {
                Some(fix) => fix,
                None => {
                    tracing::info!("Confirm blocked: no location fix");
                    return Err(CaptureError::LocationRequired);
                }
            },
        };

        self.permissions.ensure_media_permission().await;
        self.transition(PipelineState::Uploading);

        let final_photo = match self.composer.compose(&photo, &fix, &self.request).await {
            Ok(uri) => photo.with_composed(uri),
            Err(e) => {
                tracing::warn!(error = %e, "Watermark composition failed, uploading raw photo");
                photo.clone()
            }
        };

        self.permissions
            .save_to_gallery(final_photo.upload_uri())
            .await;

        match self.upload_and_submit(&final_photo, &fix).await {
            Ok((receipt, submission)) => {
                self.transition(PipelineState::Completed {
                    receipt: receipt.clone(),
                });
                Ok(ConfirmOutcome::Completed {
                    receipt,
                    submission,
                    uploaded_photo: final_photo,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, stage = e.stage(), "Evidence upload failed");
                let error = CaptureError::upload(e.to_string());
                self.transition(PipelineState::Failed {
                    reason: error.to_string(),
                });
                self.transition(PipelineState::PreviewReady { photo });
                Err(error)
            }
        }
    }

    async fn upload_and_submit(
        &self,
        photo: &CapturedPhoto,
        fix: &GeoFix,
    ) -> Result<(SubmissionReceipt, EvidenceSubmission), SubmitError> {
        let data = self.media_store.read(photo.upload_uri()).await?;

        let key = evidence_key(
            &self.key_prefix,
            &self.request.user_id,
            Utc::now().timestamp_millis(),
        );
        let handle = self
            .storage
            .upload_with_key(&key, data, EVIDENCE_CONTENT_TYPE)
            .await?;
        tracing::info!(
            storage_key = %handle.key,
            size_bytes = handle.size_bytes,
            backend = %self.storage.backend_type(),
            "Evidence uploaded"
        );

        let url = self.storage.public_url(&handle).await?;

        let submission = EvidenceSubmission::photo(&self.request, fix, url, Utc::now());
        let receipt = self.sink.submit(&submission).await?;

        tracing::info!(
            submission_id = %receipt.submission_id,
            media_url = %receipt.media_url,
            "Evidence submitted"
        );
        Ok((receipt, submission))
    }
}
