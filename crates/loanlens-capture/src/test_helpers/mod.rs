//! Test helpers for pipeline tests
//!
//! In-memory fakes for every collaborator the pipeline talks to, plus a
//! [`TestHarness`] wiring them together. No device, network or filesystem
//! is touched.

pub mod mock_devices;
pub mod mock_services;

pub use mock_devices::*;
pub use mock_services::*;

use std::sync::Arc;

use loanlens_core::models::{CaptureRequest, GeoFix, SessionContext};

use crate::pipeline::{Collaborators, EvidencePipeline};

/// Fix used by the default harness: Bengaluru, 2023-11-14T22:13:20Z.
pub fn sample_fix() -> GeoFix {
    GeoFix::new(12.97, 77.59, 1_700_000_000_000)
}

/// Request used by the default harness.
pub fn sample_request() -> CaptureRequest {
    CaptureRequest::new(&SessionContext::new("u1"))
        .with_loan("LN-1")
        .with_requirement(Some("R-7".to_string()), Some("Shop Photo".to_string()))
}

/// All mocks for one pipeline, kept around for assertions.
pub struct TestHarness {
    pub camera: Arc<MockCamera>,
    pub media_library: Arc<MockMediaLibrary>,
    pub location: Arc<MockLocation>,
    pub media_store: Arc<InMemoryMediaStore>,
    pub storage: Arc<MockStorage>,
    pub sink: Arc<MockSink>,
    pub composer: Arc<MockComposer>,
}

impl TestHarness {
    /// Everything granted, a fix available and a working composer.
    pub fn new() -> Self {
        let media_store = Arc::new(InMemoryMediaStore::new());
        Self {
            camera: Arc::new(MockCamera::granted().with_store(media_store.clone())),
            media_library: Arc::new(MockMediaLibrary::granted()),
            location: Arc::new(MockLocation::granted(sample_fix())),
            storage: Arc::new(MockStorage::new()),
            sink: Arc::new(MockSink::new()),
            composer: Arc::new(MockComposer::new(media_store.clone())),
            media_store,
        }
    }

    /// Swap the camera; shots are still written to the harness media store.
    pub fn with_camera(mut self, camera: MockCamera) -> Self {
        self.camera = Arc::new(camera.with_store(self.media_store.clone()));
        self
    }

    pub fn with_media_library(mut self, media_library: MockMediaLibrary) -> Self {
        self.media_library = Arc::new(media_library);
        self
    }

    pub fn with_location(mut self, location: MockLocation) -> Self {
        self.location = Arc::new(location);
        self
    }

    pub fn with_sink(mut self, sink: MockSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_failing_composer(mut self) -> Self {
        self.composer = Arc::new(MockComposer::failing(self.media_store.clone()));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            camera: self.camera.clone(),
            media_library: self.media_library.clone(),
            location: self.location.clone(),
            media_store: self.media_store.clone(),
            storage: self.storage.clone(),
            sink: self.sink.clone(),
            composer: self.composer.clone(),
        }
    }

    pub fn pipeline(&self, request: CaptureRequest) -> EvidencePipeline {
        EvidencePipeline::new(request, self.collaborators())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
