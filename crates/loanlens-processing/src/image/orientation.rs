use image::{imageops, DynamicImage};
use std::io::Cursor;

/// EXIF orientation handling for raw captures.
///
/// Cameras asked to skip processing hand back sensor-oriented pixels plus an
/// EXIF orientation tag; the watermark must be drawn on the upright image.
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag (1..=8), returning 1 when absent or unreadable.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let mut cursor = Cursor::new(data);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1)
    }

    /// Rotation (clockwise, applied first) and flips for an EXIF orientation.
    /// Returns (rotate_angle, flip_horizontal, flip_vertical)
    pub fn transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            2 => (None, true, false),
            3 => (Some(180), false, false),
            4 => (None, false, true),
            // transpose
            5 => (Some(90), true, false),
            6 => (Some(90), false, false),
            // transverse
            7 => (Some(270), true, false),
            8 => (Some(270), false, false),
            _ => (None, false, false),
        }
    }

    /// Apply the orientation found in `data`'s EXIF block to the decoded image.
    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        Self::apply(img, orientation)
    }

    pub fn apply(mut img: DynamicImage, orientation: u8) -> DynamicImage {
        let (rotate, flip_h, flip_v) = Self::transforms(orientation);

        if orientation != 1 {
            tracing::debug!(
                orientation = orientation,
                rotate = ?rotate,
                flip_horizontal = flip_h,
                flip_vertical = flip_v,
                "Applying EXIF orientation"
            );
        }

        if let Some(angle) = rotate {
            img = match angle {
                90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
                180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
                270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
                _ => img,
            };
        }
        if flip_h {
            img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
        }
        if flip_v {
            img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
        }

        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn test_missing_exif_is_normal() {
        assert_eq!(ImageOrientation::read_exif_orientation(&[]), 1);
        assert_eq!(ImageOrientation::read_exif_orientation(b"not an image"), 1);
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));

        // 6 = rotate 90 CW, dimensions swap
        assert_eq!(ImageOrientation::apply(img.clone(), 6).dimensions(), (2, 4));
        // 3 = rotate 180, dimensions kept
        assert_eq!(ImageOrientation::apply(img.clone(), 3).dimensions(), (4, 2));
        // 8 = rotate 270 CW, dimensions swap
        assert_eq!(ImageOrientation::apply(img.clone(), 8).dimensions(), (2, 4));
        // invalid tag leaves image untouched
        assert_eq!(ImageOrientation::apply(img, 42).dimensions(), (4, 2));
    }

    #[test]
    fn test_mirror_moves_pixels() {
        let mut raw = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        raw.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let mirrored = ImageOrientation::apply(DynamicImage::ImageRgba8(raw), 2).to_rgba8();
        assert_eq!(mirrored.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(mirrored.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_transpose_swaps_axes() {
        // Marker at (1, 0) in a 2x1 image ends up at (0, 1) in the 1x2 result.
        let mut raw = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        raw.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        let transposed = ImageOrientation::apply(DynamicImage::ImageRgba8(raw), 5).to_rgba8();
        assert_eq!(transposed.dimensions(), (1, 2));
        assert_eq!(transposed.get_pixel(0, 1), &Rgba([0, 255, 0, 255]));
    }
}
