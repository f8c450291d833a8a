//! Document OCR: PP-OCR detection + recognition pipeline.

pub mod detection;
pub mod preprocessing;
pub mod recognition;

pub use detection::{DetectionError, TextBox, TextDetector};
pub use recognition::{RecognitionError, RecognizedText, TextRecognizer};

use crate::types::{TextRegion, TextSpan};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("detection: {0}")]
    Detection(#[from] DetectionError),
    #[error("recognition: {0}")]
    Recognition(#[from] RecognitionError),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// End-to-end OCR engine: detect text regions, recognize each crop.
pub struct OcrEngine {
    detector: TextDetector,
    recognizer: TextRecognizer,
}

impl OcrEngine {
    /// Load detection and recognition models plus the character dictionary
    /// (fail-fast).
    pub fn load(det_path: &str, rec_path: &str, dict_path: &str) -> Result<Self, OcrError> {
        let detector = TextDetector::load(det_path)?;
        let recognizer = TextRecognizer::load(rec_path, dict_path)?;
        Ok(Self { detector, recognizer })
    }

    /// Extract text spans from an image, in reading order.
    ///
    /// Regions whose recognized text is empty are dropped.
    pub fn read_text(&mut self, image: &RgbImage) -> Result<Vec<TextSpan>, OcrError> {
        let (input, mapping) = preprocessing::prepare_detection_input(image);
        let boxes = self.detector.detect(&input)?;

        let mut spans = Vec::with_capacity(boxes.len());

        for b in &boxes {
            let Some(region) =
                mapping.to_image(b.x, b.y, b.width, b.height, image.width(), image.height())
            else {
                continue;
            };

            let crop = crop_region(image, &region);
            let rec_input = preprocessing::prepare_recognition_input(&crop);
            let recognized = self.recognizer.recognize(&rec_input)?;

            if recognized.text.trim().is_empty() {
                continue;
            }

            spans.push(TextSpan {
                text: recognized.text,
                confidence: recognized.confidence,
                region,
            });
        }

        tracing::debug!(spans = spans.len(), "ocr complete");

        Ok(spans)
    }
}

/// Concatenate span text in detection order, separated by single spaces.
pub fn join_text(spans: &[TextSpan]) -> String {
    spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Crop a region out of the source image. The region is assumed to be
/// within bounds (the detection mapping clamps it).
fn crop_region(image: &RgbImage, region: &TextRegion) -> RgbImage {
    image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn span(text: &str) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            confidence: 0.9,
            region: TextRegion { x: 0, y: 0, width: 10, height: 10 },
        }
    }

    #[test]
    fn test_join_text_single_spaces() {
        let spans = vec![span("PASSPORT"), span("DOE"), span("JOHN")];
        assert_eq!(join_text(&spans), "PASSPORT DOE JOHN");
    }

    #[test]
    fn test_join_text_empty() {
        assert_eq!(join_text(&[]), "");
    }

    #[test]
    fn test_join_text_single_span() {
        assert_eq!(join_text(&[span("ID")]), "ID");
    }

    #[test]
    fn test_crop_region() {
        let mut image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        image.put_pixel(10, 12, Rgb([255, 0, 0]));

        let region = TextRegion { x: 8, y: 10, width: 8, height: 6 };
        let crop = crop_region(&image, &region);

        assert_eq!(crop.dimensions(), (8, 6));
        assert_eq!(crop.get_pixel(2, 2), &Rgb([255, 0, 0]));
    }
}
