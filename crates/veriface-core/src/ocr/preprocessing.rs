//! Image preprocessing for the PP-OCR models.

use crate::types::TextRegion;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;

/// Detection model input size (square).
pub const DET_INPUT_SIZE: u32 = 640;

/// Recognition model input height.
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input.
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input.
pub const REC_MIN_WIDTH: u32 = 4;

/// ImageNet channel means.
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Letterbox pad value (mid-gray).
const PAD_VALUE: f32 = 128.0;

/// Metadata for projecting detection-space boxes back onto the source image.
pub struct DetMapping {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl DetMapping {
    /// Map a detection-space box back to source image pixels.
    ///
    /// Returns `None` when the box falls entirely outside the image or
    /// collapses to a degenerate region.
    pub fn to_image(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image_width: u32,
        image_height: u32,
    ) -> Option<TextRegion> {
        let x1 = ((x - self.pad_x) / self.scale).max(0.0);
        let y1 = ((y - self.pad_y) / self.scale).max(0.0);
        let x2 = ((x + width - self.pad_x) / self.scale).min(image_width as f32);
        let y2 = ((y + height - self.pad_y) / self.scale).min(image_height as f32);

        let w = (x2 - x1).floor();
        let h = (y2 - y1).floor();
        if w < 1.0 || h < 1.0 {
            return None;
        }

        Some(TextRegion {
            x: x1.floor() as u32,
            y: y1.floor() as u32,
            width: w as u32,
            height: h as u32,
        })
    }
}

/// Preprocess an image for text detection.
///
/// Letterbox-resizes to DET_INPUT_SIZE × DET_INPUT_SIZE (gray padding,
/// centered), normalizes with ImageNet mean/std, and emits an NCHW tensor.
pub fn prepare_detection_input(image: &RgbImage) -> (Array4<f32>, DetMapping) {
    let size = DET_INPUT_SIZE;
    let (orig_w, orig_h) = image.dimensions();

    let scale = (size as f32 / orig_w as f32).min(size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));

    // Fill with normalized pad value first, then overwrite the image area.
    for c in 0..3 {
        let pad = (PAD_VALUE / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        tensor
            .index_axis_mut(ndarray::Axis(1), c)
            .fill(pad);
    }

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = (x + pad_x) as usize;
        let ty = (y + pad_y) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    let mapping = DetMapping {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
    };

    (tensor, mapping)
}

/// Preprocess a cropped text region for recognition.
///
/// Resizes to height REC_INPUT_HEIGHT with dynamic width (aspect ratio
/// preserved, clamped to [REC_MIN_WIDTH, REC_MAX_WIDTH]) and normalizes with
/// ImageNet mean/std.
pub fn prepare_recognition_input(crop: &RgbImage) -> Array4<f32> {
    let (orig_w, orig_h) = crop.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = image::imageops::resize(crop, new_w, REC_INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, REC_INPUT_HEIGHT as usize, new_w as usize));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_detection_input_shape() {
        let image = RgbImage::from_pixel(320, 240, Rgb([200, 200, 200]));
        let (tensor, _) = prepare_detection_input(&image);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
    }

    #[test]
    fn test_detection_mapping_roundtrip() {
        // 320x240 image scales by 2 into 640x640 with vertical padding.
        let image = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
        let (_, mapping) = prepare_detection_input(&image);

        // A box covering image pixels (50,40)..(150,90) in detection space:
        // x = 50*2, y = 40*2 + pad_y, w = 200, h = 100.
        let pad_y = (640.0 - 480.0) / 2.0;
        let region = mapping
            .to_image(100.0, 80.0 + pad_y, 200.0, 100.0, 320, 240)
            .unwrap();
        assert_eq!(region.x, 50);
        assert_eq!(region.y, 40);
        assert_eq!(region.width, 100);
        assert_eq!(region.height, 50);
    }

    #[test]
    fn test_detection_mapping_clamps_to_image() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let (_, mapping) = prepare_detection_input(&image);

        // Box spilling past the right/bottom edges clamps to image bounds.
        let region = mapping
            .to_image(600.0, 600.0, 100.0, 100.0, 100, 100)
            .unwrap();
        assert!(region.x + region.width <= 100);
        assert!(region.y + region.height <= 100);
    }

    #[test]
    fn test_detection_mapping_degenerate_box() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let (_, mapping) = prepare_detection_input(&image);
        assert!(mapping.to_image(10.0, 10.0, 0.0, 0.0, 100, 100).is_none());
    }

    #[test]
    fn test_recognition_input_dynamic_width() {
        // 4:1 aspect at height 48 → width 192.
        let crop = RgbImage::from_pixel(400, 100, Rgb([255, 255, 255]));
        let tensor = prepare_recognition_input(&crop);
        assert_eq!(tensor.shape(), &[1, 3, 48, 192]);
    }

    #[test]
    fn test_recognition_input_width_clamped() {
        // Very wide crop clamps to REC_MAX_WIDTH.
        let crop = RgbImage::from_pixel(4000, 48, Rgb([255, 255, 255]));
        let tensor = prepare_recognition_input(&crop);
        assert_eq!(tensor.shape()[3], REC_MAX_WIDTH as usize);

        // Very narrow crop clamps to REC_MIN_WIDTH.
        let crop = RgbImage::from_pixel(1, 100, Rgb([255, 255, 255]));
        let tensor = prepare_recognition_input(&crop);
        assert_eq!(tensor.shape()[3], REC_MIN_WIDTH as usize);
    }

    #[test]
    fn test_uniform_image_normalizes_uniformly() {
        let crop = RgbImage::from_pixel(96, 48, Rgb([128, 128, 128]));
        let tensor = prepare_recognition_input(&crop);
        let expected_r = (128.0 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((tensor[[0, 0, 0, 0]] - expected_r).abs() < 1e-5);
        assert!((tensor[[0, 0, 47, 95]] - expected_r).abs() < 1e-5);
    }
}
