//! LoanLens image processing
//!
//! Everything needed to turn a raw camera capture into watermarked evidence:
//! watermark line derivation, overlay rendering, EXIF orientation correction
//! and JPEG encoding.

pub mod image;

pub use crate::image::codec::{decode_oriented, encode_jpeg, CodecError};
pub use crate::image::orientation::ImageOrientation;
pub use crate::image::watermark::{
    format_capture_time, watermark_lines, PanelRect, WatermarkConfig, WatermarkError,
    WatermarkPosition, WatermarkRenderer,
};
