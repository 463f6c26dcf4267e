//! Watermark composition step.
//!
//! Composition is best-effort: the pipeline uploads the raw capture whenever
//! a composer returns an error.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use loanlens_core::constants::{DEFAULT_JPEG_QUALITY, EVIDENCE_EXTENSION};
use loanlens_core::models::{CaptureRequest, CapturedPhoto, GeoFix};
use loanlens_core::Config;
use loanlens_processing::{
    decode_oriented, encode_jpeg, watermark_lines, WatermarkConfig, WatermarkRenderer,
};

use crate::devices::MediaStore;

/// Renders evidence overlays. Returns the URI of the composed image.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(
        &self,
        photo: &CapturedPhoto,
        fix: &GeoFix,
        request: &CaptureRequest,
    ) -> Result<String>;
}

/// Burns the GPS/time/loan panel into the raw capture and writes a new JPEG.
pub struct WatermarkComposer {
    media_store: Arc<dyn MediaStore>,
    renderer: Option<WatermarkRenderer>,
    timezone: Option<Tz>,
    jpeg_quality: u8,
}

impl WatermarkComposer {
    pub fn new(media_store: Arc<dyn MediaStore>, renderer: Option<WatermarkRenderer>) -> Self {
        Self {
            media_store,
            renderer,
            timezone: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Build from configuration. `WATERMARK_FONT_PATH` overrides the bundled
    /// font; an unreadable override falls back to it.
    pub fn from_config(config: &Config, media_store: Arc<dyn MediaStore>) -> Self {
        let custom = config.watermark_font_path.as_deref().and_then(|path| {
            match WatermarkRenderer::from_font_file(path, WatermarkConfig::default()) {
                Ok(renderer) => Some(renderer),
                Err(e) => {
                    tracing::warn!(error = %e, "Watermark font override unavailable, using bundled font");
                    None
                }
            }
        });
        let renderer = custom.or_else(|| match WatermarkRenderer::bundled(WatermarkConfig::default()) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                tracing::error!(error = %e, "Bundled watermark font failed to load");
                None
            }
        });

        Self::new(media_store, renderer)
            .with_timezone(config.watermark_timezone)
            .with_jpeg_quality(config.watermark_jpeg_quality)
    }
}

#[async_trait]
impl Composer for WatermarkComposer {
    async fn compose(
        &self,
        photo: &CapturedPhoto,
        fix: &GeoFix,
        request: &CaptureRequest,
    ) -> Result<String> {
        let renderer = self
            .renderer
            .clone()
            .context("Watermark renderer not available")?;

        let raw = self
            .media_store
            .read(&photo.raw_uri)
            .await
            .context("Failed to read raw capture")?;

        let lines = watermark_lines(fix, request, self.timezone);
        let quality = self.jpeg_quality;

        let composed = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let img = decode_oriented(&raw)?;
            let watermarked = renderer.render(img, &lines);
            Ok(encode_jpeg(&watermarked, quality)?)
        })
        .await
        .context("Watermark task panicked")??;

        let uri = self
            .media_store
            .write_temp(composed, EVIDENCE_EXTENSION)
            .await
            .context("Failed to write composed evidence")?;

        tracing::debug!(raw_uri = %photo.raw_uri, composed_uri = %uri, "Watermark composed");
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::InMemoryMediaStore;
    use image::GenericImageView;
    use loanlens_core::models::SessionContext;

    #[tokio::test]
    async fn without_renderer_composition_fails() {
        let store = Arc::new(InMemoryMediaStore::new());
        let uri = store.insert("mem://raw/1.jpg", vec![1, 2, 3]);
        let composer = WatermarkComposer::new(store, None);

        let photo = CapturedPhoto::from_raw(uri).unwrap();
        let result = composer
            .compose(&photo, &GeoFix::new(0.0, 0.0, 0), &CaptureRequest::default())
            .await;
        assert!(result.is_err());
    }

    fn stored_jpeg(store: &InMemoryMediaStore, width: u32, height: u32) -> CapturedPhoto {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        let uri = store.insert(&format!("mem://raw/{}x{}.jpg", width, height), out.into_inner());
        CapturedPhoto::from_raw(uri).unwrap()
    }

    fn request() -> CaptureRequest {
        CaptureRequest::new(&SessionContext::new("u1"))
            .with_loan("LN-1")
            .with_requirement(None, Some("Shop Photo".to_string()))
    }

    #[tokio::test]
    async fn default_config_watermarks_with_bundled_font() {
        let store = Arc::new(InMemoryMediaStore::new());
        let composer = WatermarkComposer::from_config(&Config::default(), store.clone());
        assert!(composer.renderer.is_some());
        assert_eq!(composer.jpeg_quality, 90);

        let photo = stored_jpeg(&store, 400, 300);
        let uri = composer
            .compose(&photo, &GeoFix::new(12.97, 77.59, 1_700_000_000_000), &request())
            .await
            .unwrap();
        assert_ne!(uri, photo.raw_uri);

        let composed = image::load_from_memory(&store.get(&uri).unwrap())
            .unwrap()
            .to_rgb8();
        assert_eq!(composed.dimensions(), (400, 300));
        // Panel corner sits in the bottom-left margin and is darkened.
        assert!(composed.get_pixel(12, 300 - 14)[0] < 130);
        assert!(composed.get_pixel(390, 10)[0] > 180);
        // Raw capture is left as it was.
        assert!(store.get(&photo.raw_uri).is_some());
    }

    #[tokio::test]
    async fn tiny_captures_are_composed() {
        let store = Arc::new(InMemoryMediaStore::new());
        let composer = WatermarkComposer::from_config(&Config::default(), store.clone());

        for (width, height) in [(1, 1), (3, 200)] {
            let photo = stored_jpeg(&store, width, height);
            let uri = composer
                .compose(&photo, &GeoFix::new(0.0, 0.0, 0), &request())
                .await
                .unwrap();
            let composed = image::load_from_memory(&store.get(&uri).unwrap()).unwrap();
            assert_eq!(composed.dimensions(), (width, height));
        }
    }

    #[tokio::test]
    async fn unreadable_font_override_falls_back_to_bundled() {
        let store = Arc::new(InMemoryMediaStore::new());
        let config = Config {
            watermark_font_path: Some("/nonexistent/font.ttf".into()),
            ..Config::default()
        };
        let composer = WatermarkComposer::from_config(&config, store);
        assert!(composer.renderer.is_some());
    }

    #[tokio::test]
    async fn undecodable_capture_fails_composition() {
        let store = Arc::new(InMemoryMediaStore::new());
        let uri = store.insert("mem://raw/1.jpg", b"not an image".to_vec());
        let composer = WatermarkComposer::from_config(&Config::default(), store);

        let photo = CapturedPhoto::from_raw(uri).unwrap();
        let result = composer
            .compose(&photo, &GeoFix::new(0.0, 0.0, 0), &request())
            .await;
        assert!(result.is_err());
    }
}
