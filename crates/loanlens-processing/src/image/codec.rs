//! Decode raw captures and encode composed evidence.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use thiserror::Error;

use super::orientation::ImageOrientation;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Decode image bytes and rotate them upright according to EXIF.
pub fn decode_oriented(data: &[u8]) -> Result<DynamicImage, CodecError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let img = reader
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(ImageOrientation::apply_exif_orientation(img, data))
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn decodes_and_reencodes_as_jpeg() {
        let img = decode_oriented(&png_bytes(40, 30)).unwrap();
        assert_eq!(img.dimensions(), (40, 30));

        let jpeg = encode_jpeg(&img, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode_oriented(b"definitely not a photo"),
            Err(CodecError::Decode(_))
        ));
    }
}
