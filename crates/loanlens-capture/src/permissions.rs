//! Permission Coordinator
//!
//! Acquires camera, gallery and location access one prompt at a time and
//! owns the session's current GPS fix.

use std::sync::{Arc, Mutex, MutexGuard};

use loanlens_core::models::{GeoFix, LocationStatus, PermissionState, PermissionStatus};

use crate::devices::{CameraDevice, LocationProvider, MediaLibrary};

/// Non-blocking notice for the user. The session continues either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Gallery access is unavailable; captures will not be saved to the device.
    GalleryLimited,
    /// No location yet; confirmation will ask again.
    LocationNeeded,
}

impl Advisory {
    pub fn title(&self) -> &'static str {
        match self {
            Advisory::GalleryLimited => "Gallery access limited",
            Advisory::LocationNeeded => "Location needed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Advisory::GalleryLimited => {
                "Saving captures to the device gallery is unavailable. Evidence uploads will continue."
            }
            Advisory::LocationNeeded => "Grant location access to embed GPS on the photo.",
        }
    }
}

/// Result of the start-of-session permission sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct InitReport {
    pub permissions: PermissionState,
    pub fix: Option<GeoFix>,
    pub advisories: Vec<Advisory>,
}

impl InitReport {
    /// Camera denial blocks the whole session.
    pub fn camera_blocked(&self) -> bool {
        !self.permissions.camera.is_granted()
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    permissions: PermissionState,
    fix: Option<GeoFix>,
}

pub struct PermissionCoordinator {
    camera: Arc<dyn CameraDevice>,
    media_library: Arc<dyn MediaLibrary>,
    location: Arc<dyn LocationProvider>,
    snapshot: Mutex<Snapshot>,
}

impl PermissionCoordinator {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        media_library: Arc<dyn MediaLibrary>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            camera,
            media_library,
            location,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        // Never held across an await; a poisoned lock still holds valid data.
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn permissions(&self) -> PermissionState {
        self.snapshot().permissions
    }

    pub fn current_fix(&self) -> Option<GeoFix> {
        self.snapshot().fix
    }

    pub fn location_status(&self) -> LocationStatus {
        let snapshot = self.snapshot();
        LocationStatus::from_parts(snapshot.fix.as_ref(), snapshot.permissions.location)
    }

    /// Camera, then gallery, then location, strictly in sequence.
    pub async fn initialize(&self) -> InitReport {
        let mut advisories = Vec::new();

        self.request_camera_permission().await;

        if let Some(advisory) = self.request_media_permission().await {
            advisories.push(advisory);
        }

        let location = self.request_location_permission().await;
        let fix = if location.is_granted() {
            self.refresh_fix().await
        } else {
            None
        };
        if fix.is_none() {
            advisories.push(Advisory::LocationNeeded);
        }

        let snapshot = self.snapshot();
        tracing::info!(
            camera = ?snapshot.permissions.camera,
            media_library = ?snapshot.permissions.media_library,
            location = ?snapshot.permissions.location,
            has_fix = snapshot.fix.is_some(),
            "Capture permissions initialized"
        );

        InitReport {
            permissions: snapshot.permissions,
            fix: snapshot.fix,
            advisories,
        }
    }

    /// Prompt for camera access. Errors count as denial.
    pub async fn request_camera_permission(&self) -> PermissionStatus {
        let status = match self.camera.request_permission().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Camera permission request failed");
                PermissionStatus::Denied
            }
        };
        self.snapshot().permissions.camera = status;
        status
    }

    /// Prompt for gallery access. Returns an advisory when gallery saves will be skipped.
    pub async fn request_media_permission(&self) -> Option<Advisory> {
        let (status, advisory) = match self.media_library.request_permission().await {
            Ok(PermissionStatus::Granted) => (PermissionStatus::Granted, None),
            Ok(_) => {
                tracing::warn!("Media library permission denied. Saving to gallery will be skipped.");
                (PermissionStatus::Denied, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Media library permission error");
                (PermissionStatus::Denied, Some(Advisory::GalleryLimited))
            }
        };
        self.snapshot().permissions.media_library = status;
        advisory
    }

    /// Re-prompt for gallery access unless it is already granted.
    pub async fn ensure_media_permission(&self) -> PermissionStatus {
        if self.permissions().media_library.is_granted() {
            return PermissionStatus::Granted;
        }
        self.request_media_permission().await;
        self.permissions().media_library
    }

    async fn request_location_permission(&self) -> PermissionStatus {
        let status = match self.location.request_foreground_permission().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Location permission request failed");
                PermissionStatus::Denied
            }
        };
        self.snapshot().permissions.location = status;
        status
    }

    async fn refresh_fix(&self) -> Option<GeoFix> {
        match self.location.current_fix().await {
            Ok(fix) => {
                self.snapshot().fix = Some(fix);
                tracing::debug!(
                    latitude = fix.latitude,
                    longitude = fix.longitude,
                    timestamp_millis = fix.timestamp_millis,
                    "Location fix updated"
                );
                Some(fix)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to get current location");
                None
            }
        }
    }

    /// Fresh fix for confirmation. Re-prompts when location is not granted;
    /// `None` means no fix is obtainable and submission must not proceed.
    pub async fn ensure_location(&self) -> Option<GeoFix> {
        if !self.permissions().location.is_granted() {
            let status = self.request_location_permission().await;
            if !status.is_granted() {
                tracing::info!("Location permission still denied");
                return None;
            }
        }
        self.refresh_fix().await
    }

    /// Save to the device gallery when allowed. Failures are logged, never raised.
    pub async fn save_to_gallery(&self, uri: &str) {
        if !self.permissions().media_library.is_granted() {
            return;
        }
        if let Err(e) = self.media_library.save(uri).await {
            tracing::warn!(error = %e, uri = %uri, "Failed to save to media library");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockCamera, MockLocation, MockMediaLibrary};
    use loanlens_core::models::PermissionStatus::{Denied, Granted, Unknown};

    fn coordinator(
        camera: MockCamera,
        media: MockMediaLibrary,
        location: MockLocation,
    ) -> (PermissionCoordinator, Arc<MockMediaLibrary>, Arc<MockLocation>) {
        let media = Arc::new(media);
        let location = Arc::new(location);
        let coordinator =
            PermissionCoordinator::new(Arc::new(camera), media.clone(), location.clone());
        (coordinator, media, location)
    }

    #[tokio::test]
    async fn initialize_grants_everything_and_fetches_fix() {
        let fix = GeoFix::new(12.97, 77.59, 1_700_000_000_000);
        let (coordinator, _, _) = coordinator(
            MockCamera::granted(),
            MockMediaLibrary::granted(),
            MockLocation::granted(fix),
        );

        assert_eq!(coordinator.permissions().camera, Unknown);

        let report = coordinator.initialize().await;
        assert_eq!(report.permissions.camera, Granted);
        assert_eq!(report.permissions.media_library, Granted);
        assert_eq!(report.permissions.location, Granted);
        assert_eq!(report.fix, Some(fix));
        assert!(report.advisories.is_empty());
        assert!(!report.camera_blocked());
    }

    #[tokio::test]
    async fn unsupported_gallery_is_advisory_only() {
        let (coordinator, _, _) = coordinator(
            MockCamera::granted(),
            MockMediaLibrary::unsupported(),
            MockLocation::granted(GeoFix::new(0.0, 0.0, 0)),
        );

        let report = coordinator.initialize().await;
        assert_eq!(report.permissions.media_library, Denied);
        assert_eq!(report.advisories, vec![Advisory::GalleryLimited]);
        assert_eq!(report.permissions.camera, Granted);
    }

    #[tokio::test]
    async fn denied_location_skips_fix_and_reprompts() {
        let fix = GeoFix::new(1.0, 2.0, 3);
        let location = MockLocation::granted(fix).with_permission_sequence(vec![Denied, Denied]);
        let (coordinator, _, location) =
            coordinator(MockCamera::granted(), MockMediaLibrary::granted(), location);

        let report = coordinator.initialize().await;
        assert_eq!(report.permissions.location, Denied);
        assert!(report.fix.is_none());
        assert_eq!(report.advisories, vec![Advisory::LocationNeeded]);
        assert_eq!(location.fix_requests(), 0);
        assert_eq!(
            coordinator.location_status().to_string(),
            "Location permission required"
        );

        // Still denied on the re-prompt.
        assert!(coordinator.ensure_location().await.is_none());
        assert_eq!(location.permission_requests(), 2);

        // Third prompt falls through to the default (granted).
        assert_eq!(coordinator.ensure_location().await, Some(fix));
        assert_eq!(coordinator.current_fix(), Some(fix));
        assert_eq!(coordinator.location_status().to_string(), "1.0000, 2.0000");
    }

    #[tokio::test]
    async fn granted_location_without_lock_needs_location() {
        let (coordinator, _, location) = coordinator(
            MockCamera::granted(),
            MockMediaLibrary::granted(),
            MockLocation::granted(GeoFix::new(0.0, 0.0, 0)).without_fix(),
        );

        let report = coordinator.initialize().await;
        assert_eq!(report.permissions.location, Granted);
        assert_eq!(report.advisories, vec![Advisory::LocationNeeded]);
        assert_eq!(location.fix_requests(), 1);
    }

    #[tokio::test]
    async fn ensure_location_replaces_fix() {
        let first = GeoFix::new(1.0, 1.0, 1);
        let second = GeoFix::new(2.0, 2.0, 2);
        let (coordinator, _, location) = coordinator(
            MockCamera::granted(),
            MockMediaLibrary::granted(),
            MockLocation::granted(first),
        );
        coordinator.initialize().await;
        assert_eq!(coordinator.current_fix(), Some(first));

        location.set_fix(second);
        assert_eq!(coordinator.ensure_location().await, Some(second));
        assert_eq!(coordinator.current_fix(), Some(second));
        assert_eq!(location.permission_requests(), 1);
    }

    #[tokio::test]
    async fn gallery_save_respects_permission_and_swallows_errors() {
        let (coordinator, media, _) = coordinator(
            MockCamera::granted(),
            MockMediaLibrary::denied(),
            MockLocation::granted(GeoFix::new(0.0, 0.0, 0)),
        );
        coordinator.initialize().await;
        coordinator.save_to_gallery("mem://raw/1.jpg").await;
        assert!(media.saved().is_empty());

        let (coordinator, media, _) = coordinator_with_failing_gallery();
        coordinator.initialize().await;
        coordinator.save_to_gallery("mem://raw/1.jpg").await;
        assert!(media.saved().is_empty());
    }

    fn coordinator_with_failing_gallery(
    ) -> (PermissionCoordinator, Arc<MockMediaLibrary>, Arc<MockLocation>) {
        coordinator(
            MockCamera::granted(),
            MockMediaLibrary::granted().failing_saves(),
            MockLocation::granted(GeoFix::new(0.0, 0.0, 0)),
        )
    }

    #[tokio::test]
    async fn camera_error_counts_as_denied() {
        let (coordinator, _, _) = coordinator(
            MockCamera::erroring(),
            MockMediaLibrary::granted(),
            MockLocation::granted(GeoFix::new(0.0, 0.0, 0)),
        );
        let report = coordinator.initialize().await;
        assert_eq!(report.permissions.camera, Denied);
        assert!(report.camera_blocked());
    }
}
