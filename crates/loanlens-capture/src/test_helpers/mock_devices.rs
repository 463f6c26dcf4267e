//! In-memory device bindings

use async_trait::async_trait;
use loanlens_core::models::{GeoFix, PermissionStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::devices::{
    CameraDevice, CaptureOptions, DeviceError, DeviceResult, LocationProvider, MediaLibrary,
    MediaStore, RawPhoto,
};

/// Smallest valid JPEG the sample camera hands out.
pub fn sample_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 24, image::Rgb([180, 40, 40]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("encode sample jpeg");
    out.into_inner()
}

/// Media store that keeps files in a map keyed by `mem://` URIs
#[derive(Default)]
pub struct InMemoryMediaStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    counter: AtomicUsize,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a file at `uri` and return the URI
    pub fn insert(&self, uri: &str, data: Vec<u8>) -> String {
        self.files.lock().unwrap().insert(uri.to_string(), data);
        uri.to_string()
    }

    pub fn get(&self, uri: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn read(&self, uri: &str) -> DeviceResult<Vec<u8>> {
        self.get(uri)
            .ok_or_else(|| DeviceError::Platform(format!("No such media: {}", uri)))
    }

    async fn write_temp(&self, data: Vec<u8>, extension: &str) -> DeviceResult<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = format!("mem://temp/{}.{}", n, extension.trim_start_matches('.'));
        Ok(self.insert(&uri, data))
    }
}

/// Camera returning `mem://raw/{n}.jpg` shots
pub struct MockCamera {
    permission: Option<PermissionStatus>,
    fail_shots: AtomicBool,
    empty_uri: bool,
    delay: Option<Duration>,
    store: Option<Arc<InMemoryMediaStore>>,
    shots: AtomicUsize,
    last_options: Mutex<Option<CaptureOptions>>,
}

impl MockCamera {
    fn with_permission(permission: Option<PermissionStatus>) -> Self {
        Self {
            permission,
            fail_shots: AtomicBool::new(false),
            empty_uri: false,
            delay: None,
            store: None,
            shots: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn granted() -> Self {
        Self::with_permission(Some(PermissionStatus::Granted))
    }

    pub fn denied() -> Self {
        Self::with_permission(Some(PermissionStatus::Denied))
    }

    /// Permission request raises a platform error
    pub fn erroring() -> Self {
        Self::with_permission(None)
    }

    /// Each shot is also written into `store` with [`sample_jpeg`] content
    pub fn with_store(mut self, store: Arc<InMemoryMediaStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shots succeed at the platform level but return an empty URI
    pub fn returning_empty_uri(mut self) -> Self {
        self.empty_uri = true;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_shots.store(failing, Ordering::SeqCst);
    }

    pub fn shots(&self) -> usize {
        self.shots.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<CaptureOptions> {
        *self.last_options.lock().unwrap()
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn request_permission(&self) -> DeviceResult<PermissionStatus> {
        self.permission
            .ok_or_else(|| DeviceError::Platform("camera service unavailable".to_string()))
    }

    async fn take_photo(&self, options: CaptureOptions) -> DeviceResult<RawPhoto> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        *self.last_options.lock().unwrap() = Some(options);
        let n = self.shots.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_shots.load(Ordering::SeqCst) {
            return Err(DeviceError::Platform("shutter jammed".to_string()));
        }
        if self.empty_uri {
            return Ok(RawPhoto { uri: String::new() });
        }

        let uri = format!("mem://raw/{}.jpg", n);
        if let Some(store) = &self.store {
            store.insert(&uri, sample_jpeg());
        }
        Ok(RawPhoto { uri })
    }
}

/// Gallery recording every saved URI
pub struct MockMediaLibrary {
    permission: Option<PermissionStatus>,
    fail_saves: bool,
    saved: Mutex<Vec<String>>,
    permission_requests: AtomicUsize,
}

impl MockMediaLibrary {
    fn with_permission(permission: Option<PermissionStatus>) -> Self {
        Self {
            permission,
            fail_saves: false,
            saved: Mutex::new(Vec::new()),
            permission_requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::with_permission(Some(PermissionStatus::Granted))
    }

    pub fn denied() -> Self {
        Self::with_permission(Some(PermissionStatus::Denied))
    }

    /// Permission request raises "unsupported in this runtime"
    pub fn unsupported() -> Self {
        Self::with_permission(None)
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaLibrary for MockMediaLibrary {
    async fn request_permission(&self) -> DeviceResult<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        self.permission
            .ok_or_else(|| DeviceError::Unsupported("media library".to_string()))
    }

    async fn save(&self, uri: &str) -> DeviceResult<()> {
        if self.fail_saves {
            return Err(DeviceError::Platform("gallery full".to_string()));
        }
        self.saved.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}

/// Location provider with a scripted permission sequence
pub struct MockLocation {
    fix: Mutex<Option<GeoFix>>,
    sequence: Mutex<VecDeque<PermissionStatus>>,
    fallback: PermissionStatus,
    permission_requests: AtomicUsize,
    fix_requests: AtomicUsize,
}

impl MockLocation {
    pub fn granted(fix: GeoFix) -> Self {
        Self {
            fix: Mutex::new(Some(fix)),
            sequence: Mutex::new(VecDeque::new()),
            fallback: PermissionStatus::Granted,
            permission_requests: AtomicUsize::new(0),
            fix_requests: AtomicUsize::new(0),
        }
    }

    /// Denied on every prompt
    pub fn denied() -> Self {
        Self {
            fallback: PermissionStatus::Denied,
            ..Self::granted(GeoFix::new(0.0, 0.0, 0))
        }
    }

    /// Answer prompts from `sequence` first, then fall back to the default
    pub fn with_permission_sequence(self, sequence: Vec<PermissionStatus>) -> Self {
        *self.sequence.lock().unwrap() = sequence.into();
        self
    }

    /// Permission is granted but no fix can be obtained
    pub fn without_fix(self) -> Self {
        *self.fix.lock().unwrap() = None;
        self
    }

    pub fn set_fix(&self, fix: GeoFix) {
        *self.fix.lock().unwrap() = Some(fix);
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn fix_requests(&self) -> usize {
        self.fix_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for MockLocation {
    async fn request_foreground_permission(&self) -> DeviceResult<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .sequence
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback))
    }

    async fn current_fix(&self) -> DeviceResult<GeoFix> {
        self.fix_requests.fetch_add(1, Ordering::SeqCst);
        (*self.fix.lock().unwrap())
            .ok_or_else(|| DeviceError::Platform("no GPS lock".to_string()))
    }
}
