//! File-backed camera, directory gallery and fixed GPS position.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use loanlens_capture::devices::{path_to_uri, uri_to_path};
use loanlens_capture::{
    CameraDevice, CaptureOptions, DeviceError, DeviceResult, LocationProvider, MediaLibrary,
    MediaStore, RawPhoto,
};
use loanlens_core::models::{GeoFix, PermissionStatus};
use tokio::fs;

/// "Takes" a photo by copying an existing image into temp media.
pub struct FileCamera {
    source: PathBuf,
    media_store: Arc<dyn MediaStore>,
}

impl FileCamera {
    pub fn new(source: impl Into<PathBuf>, media_store: Arc<dyn MediaStore>) -> Self {
        Self {
            source: source.into(),
            media_store,
        }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn request_permission(&self) -> DeviceResult<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn take_photo(&self, options: CaptureOptions) -> DeviceResult<RawPhoto> {
        let data = fs::read(&self.source).await.map_err(|e| {
            DeviceError::Platform(format!("Failed to read {}: {}", self.source.display(), e))
        })?;
        let extension = self
            .source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");

        tracing::debug!(
            source = %self.source.display(),
            quality = options.quality,
            skip_processing = options.skip_processing,
            "Loading photo from file"
        );
        let uri = self.media_store.write_temp(data, extension).await?;
        Ok(RawPhoto { uri })
    }
}

/// Gallery backed by a directory. Without one, access is unsupported.
pub struct DirectoryGallery {
    dir: Option<PathBuf>,
}

impl DirectoryGallery {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl MediaLibrary for DirectoryGallery {
    async fn request_permission(&self) -> DeviceResult<PermissionStatus> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| DeviceError::Unsupported("no gallery directory".to_string()))?;
        fs::create_dir_all(dir).await?;
        Ok(PermissionStatus::Granted)
    }

    async fn save(&self, uri: &str) -> DeviceResult<()> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| DeviceError::Unsupported("no gallery directory".to_string()))?;
        let source = uri_to_path(uri);
        let name = source
            .file_name()
            .ok_or_else(|| DeviceError::Platform(format!("Not a file: {}", uri)))?;
        let target = dir.join(name);
        fs::copy(&source, &target).await?;
        tracing::debug!(saved = %path_to_uri(&target), "Saved to gallery");
        Ok(())
    }
}

/// Reports one fixed position, timestamped when read.
pub struct FixedLocation {
    position: Option<(f64, f64)>,
    granted: bool,
}

impl FixedLocation {
    pub fn new(position: Option<(f64, f64)>, granted: bool) -> Self {
        Self { position, granted }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_foreground_permission(&self) -> DeviceResult<PermissionStatus> {
        Ok(PermissionStatus::from(self.granted))
    }

    async fn current_fix(&self) -> DeviceResult<GeoFix> {
        if !self.granted {
            return Err(DeviceError::PermissionDenied("location".to_string()));
        }
        let (latitude, longitude) = self
            .position
            .ok_or_else(|| DeviceError::Platform("no GPS lock".to_string()))?;
        Ok(GeoFix::new(latitude, longitude, Utc::now().timestamp_millis()))
    }
}
