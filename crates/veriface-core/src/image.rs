//! Decoding of uploaded image payloads.

use image::RgbImage;
use thiserror::Error;

/// Maximum accepted payload size (10 MiB).
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image data is empty")]
    EmptyData,
    #[error("image data is too large: {0} bytes (max {MAX_IMAGE_BYTES})")]
    TooLarge(usize),
    #[error("failed to decode image: {0}")]
    DecodeFailed(String),
}

/// Decode raw uploaded bytes into an RGB pixel buffer.
///
/// The format is sniffed from the data itself; anything the `image` crate
/// recognizes (PNG, JPEG, WebP, GIF, BMP, TIFF) is accepted.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_valid_png() {
        let bytes = png_bytes(16, 8);
        let img = decode_image(&bytes).unwrap();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 8);
        assert_eq!(img.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_image(&[]), Err(ImageError::EmptyData)));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_image(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, ImageError::DecodeFailed(_)));
    }

    #[test]
    fn test_decode_truncated_png() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            decode_image(&bytes),
            Err(ImageError::DecodeFailed(_))
        ));
    }
}
