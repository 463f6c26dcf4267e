//! Device collaborators as seen by the capture pipeline.
//!
//! Each platform capability (camera, gallery, GPS, temp media files) is a
//! separate trait so a host can supply any subset of real and fake bindings.

use async_trait::async_trait;
use loanlens_core::models::{GeoFix, PermissionStatus};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Errors raised by device bindings
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The capability does not exist in this runtime (e.g. gallery access in a sandbox build)
    #[error("Unsupported in this runtime: {0}")]
    Unsupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Options passed to the camera for a single shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// 0.0..=1.0
    pub quality: f32,
    /// Return sensor output without platform post-processing (rotation, etc.)
    pub skip_processing: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 1.0,
            skip_processing: true,
        }
    }
}

/// Photo handed back by the camera, stored in platform temp storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhoto {
    pub uri: String,
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn request_permission(&self) -> DeviceResult<PermissionStatus>;

    async fn take_photo(&self, options: CaptureOptions) -> DeviceResult<RawPhoto>;
}

#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// May fail with [`DeviceError::Unsupported`]; callers treat any error as denied.
    async fn request_permission(&self) -> DeviceResult<PermissionStatus>;

    async fn save(&self, uri: &str) -> DeviceResult<()>;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_foreground_permission(&self) -> DeviceResult<PermissionStatus>;

    async fn current_fix(&self) -> DeviceResult<GeoFix>;
}

/// Platform temp media: where captures live and composed images are written.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn read(&self, uri: &str) -> DeviceResult<Vec<u8>>;

    /// Persist `data` as a new temp file and return its URI.
    async fn write_temp(&self, data: Vec<u8>, extension: &str) -> DeviceResult<String>;
}

const FILE_SCHEME: &str = "file://";

/// Convert a `file://` URI (or bare path) to a filesystem path.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri))
}

pub fn path_to_uri(path: &Path) -> String {
    format!("{}{}", FILE_SCHEME, path.display())
}

/// [`MediaStore`] over a temp directory using `file://` URIs.
#[derive(Clone, Debug)]
pub struct FsMediaStore {
    dir: PathBuf,
}

impl FsMediaStore {
    pub async fn new(dir: impl Into<PathBuf>) -> DeviceResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn read(&self, uri: &str) -> DeviceResult<Vec<u8>> {
        let path = uri_to_path(uri);
        fs::read(&path).await.map_err(|e| {
            DeviceError::Platform(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn write_temp(&self, data: Vec<u8>, extension: &str) -> DeviceResult<String> {
        let path = self
            .dir
            .join(format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.')));
        fs::write(&path, data).await?;
        Ok(path_to_uri(&path))
    }
}
