//! Evidence watermark: GPS, time and loan details burned into the photo.

use ab_glyph::{FontArc, PxScale};
use chrono::Local;
use chrono_tz::Tz;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use thiserror::Error;

use loanlens_core::models::{CaptureRequest, GeoFix};

/// DejaVu Sans (Bitstream Vera license, see `assets/DejaVuSans-LICENSE.txt`).
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Failed to load watermark font: {0}")]
    FontLoad(String),
}

/// Watermark panel position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Custom { x: u32, y: u32 },
}

/// Watermark panel styling
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub position: WatermarkPosition,
    /// Panel opacity, 0.0 (invisible) to 1.0 (solid)
    pub opacity: f32,
    /// Text height as a percentage of the image height
    pub text_height_percent: f32,
    /// Smallest text height in pixels, for small images
    pub min_text_height: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            position: WatermarkPosition::BottomLeft,
            opacity: 0.55,
            text_height_percent: 2.5,
            min_text_height: 12.0,
        }
    }
}

/// Render a capture instant as `DD-MM-YYYY HH:MM` (24h), in `tz` or device-local time.
pub fn format_capture_time(fix: &GeoFix, tz: Option<Tz>) -> String {
    const FORMAT: &str = "%d-%m-%Y %H:%M";
    let captured_at = fix.captured_at();
    match tz {
        Some(tz) => captured_at.with_timezone(&tz).format(FORMAT).to_string(),
        None => captured_at.with_timezone(&Local).format(FORMAT).to_string(),
    }
}

/// Watermark text, one entry per line, in fixed order: lat, lon, time, loan, req, user.
/// Lines whose source field is absent or empty are left out entirely.
pub fn watermark_lines(fix: &GeoFix, request: &CaptureRequest, tz: Option<Tz>) -> Vec<String> {
    fn present(value: Option<&str>) -> Option<&str> {
        value.filter(|v| !v.is_empty())
    }

    let mut lines = vec![
        format!("Lat: {:.5}", fix.latitude),
        format!("Lon: {:.5}", fix.longitude),
        format!("Time: {}", format_capture_time(fix, tz)),
    ];
    if let Some(loan) = present(request.loan_id.as_deref()) {
        lines.push(format!("Loan: {}", loan));
    }
    if let Some(req) = present(request.requirement_name.as_deref()) {
        lines.push(format!("Req: {}", req));
    }
    if let Some(user) = present(Some(request.user_id.as_str())) {
        lines.push(format!("User: {}", user));
    }
    lines
}

/// Pixel rectangle of the overlay panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PanelRect {
    /// Top-left corner for a panel of `size` inside an image of `bounds`, kept `margin` from the edges.
    pub fn place(
        bounds: (u32, u32),
        size: (u32, u32),
        position: WatermarkPosition,
        margin: u32,
    ) -> Self {
        let (img_width, img_height) = bounds;
        let width = size.0.min(img_width);
        let height = size.1.min(img_height);
        let right = img_width.saturating_sub(width);
        let bottom = img_height.saturating_sub(height);

        let (x, y) = match position {
            WatermarkPosition::TopLeft => (margin.min(right), margin.min(bottom)),
            WatermarkPosition::TopRight => (right.saturating_sub(margin), margin.min(bottom)),
            WatermarkPosition::BottomLeft => (margin.min(right), bottom.saturating_sub(margin)),
            WatermarkPosition::BottomRight => {
                (right.saturating_sub(margin), bottom.saturating_sub(margin))
            }
            WatermarkPosition::Custom { x, y } => (x.min(right), y.min(bottom)),
        };

        PanelRect {
            x,
            y,
            width,
            height,
        }
    }

    /// Darken the panel area with black at `opacity`.
    pub fn blend(&self, img: &mut RgbaImage, opacity: f32) {
        let alpha = opacity.clamp(0.0, 1.0);
        let (img_width, img_height) = img.dimensions();
        for y in self.y..(self.y + self.height).min(img_height) {
            for x in self.x..(self.x + self.width).min(img_width) {
                let pixel = img.get_pixel_mut(x, y);
                for channel in 0..3 {
                    pixel[channel] = (pixel[channel] as f32 * (1.0 - alpha)).round() as u8;
                }
            }
        }
    }
}

/// Draws watermark panels with a loaded font.
#[derive(Clone)]
pub struct WatermarkRenderer {
    font: FontArc,
    config: WatermarkConfig,
}

impl WatermarkRenderer {
    pub fn new(font: FontArc, config: WatermarkConfig) -> Self {
        Self { font, config }
    }

    /// Renderer using the font compiled into this crate.
    pub fn bundled(config: WatermarkConfig) -> Result<Self, WatermarkError> {
        let font =
            FontArc::try_from_slice(BUNDLED_FONT).map_err(|e| WatermarkError::FontLoad(e.to_string()))?;
        Ok(Self::new(font, config))
    }

    pub fn from_font_bytes(data: Vec<u8>, config: WatermarkConfig) -> Result<Self, WatermarkError> {
        let font = FontArc::try_from_vec(data).map_err(|e| WatermarkError::FontLoad(e.to_string()))?;
        Ok(Self::new(font, config))
    }

    pub fn from_font_file(path: &Path, config: WatermarkConfig) -> Result<Self, WatermarkError> {
        let data = std::fs::read(path)
            .map_err(|e| WatermarkError::FontLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_font_bytes(data, config)
    }

    fn scale_for(&self, img_height: u32) -> PxScale {
        let height = (img_height as f32 * self.config.text_height_percent / 100.0)
            .max(self.config.min_text_height);
        PxScale::from(height)
    }

    /// Panel rectangle the given lines would occupy, or `None` when there is nothing to draw.
    pub fn panel_rect(&self, bounds: (u32, u32), lines: &[String]) -> Option<PanelRect> {
        if lines.is_empty() {
            return None;
        }
        let scale = self.scale_for(bounds.1);
        let line_height = (scale.y * 1.25).ceil() as u32;
        let padding = (scale.y * 0.8).ceil() as u32;
        let text_width = lines
            .iter()
            .map(|line| text_size(scale, &self.font, line).0)
            .max()
            .unwrap_or(0);

        let size = (
            text_width + padding * 2,
            line_height * lines.len() as u32 + padding * 2,
        );
        let margin = (bounds.0.min(bounds.1) as f32 * 0.03).round() as u32;
        Some(PanelRect::place(bounds, size, self.config.position, margin))
    }

    /// Draw the panel and its lines onto `img`.
    pub fn render(&self, img: DynamicImage, lines: &[String]) -> DynamicImage {
        let bounds = img.dimensions();
        let Some(rect) = self.panel_rect(bounds, lines) else {
            return img;
        };

        let mut canvas = img.to_rgba8();
        rect.blend(&mut canvas, self.config.opacity);

        let scale = self.scale_for(bounds.1);
        let line_height = (scale.y * 1.25).ceil() as i32;
        let padding = (scale.y * 0.8).ceil() as i32;
        let white = Rgba([255, 255, 255, 255]);

        for (index, line) in lines.iter().enumerate() {
            let x = rect.x as i32 + padding;
            let y = rect.y as i32 + padding + line_height * index as i32;
            draw_text_mut(&mut canvas, white, x, y, scale, &self.font, line);
        }

        DynamicImage::ImageRgba8(canvas)
    }
}
