//! Face matching: SCRFD detection + ArcFace embeddings.

pub mod alignment;
pub mod detector;
pub mod recognizer;

pub use detector::{DetectorError, FaceDetector};
pub use recognizer::{FaceRecognizer, RecognizerError};

use crate::types::{Embedding, FaceMatch};
use image::RgbImage;
use thiserror::Error;

/// Cosine similarity at or above which two faces count as the same person.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.40;

#[derive(Error, Debug)]
pub enum FaceMatchError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// One-to-one face matcher comparing a selfie against a document photo.
pub struct FaceMatcher {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    similarity_threshold: f32,
}

impl FaceMatcher {
    /// Load the detection and recognition models (fail-fast).
    pub fn load(
        scrfd_path: &str,
        arcface_path: &str,
        similarity_threshold: f32,
    ) -> Result<Self, FaceMatchError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let recognizer = FaceRecognizer::load(arcface_path)?;
        Ok(Self {
            detector,
            recognizer,
            similarity_threshold,
        })
    }

    /// Compare the selfie against the document photo.
    ///
    /// Face-detection enforcement is disabled: when no face (or no usable
    /// landmarks) is found in an image, the whole frame is embedded instead
    /// and the comparison proceeds best-effort.
    pub fn compare(
        &mut self,
        selfie: &RgbImage,
        document: &RgbImage,
    ) -> Result<FaceMatch, FaceMatchError> {
        let probe = self.embed_best_effort(selfie)?;
        let reference = self.embed_best_effort(document)?;

        let similarity = probe.similarity(&reference);
        let distance = probe.distance(&reference);

        tracing::debug!(similarity, distance, "face comparison complete");

        Ok(FaceMatch {
            verified: similarity >= self.similarity_threshold,
            distance,
        })
    }

    /// Embed the best detected face, falling back to the unaligned whole
    /// frame when nothing is confidently localized.
    fn embed_best_effort(&mut self, image: &RgbImage) -> Result<Embedding, FaceMatchError> {
        let faces = self.detector.detect(image)?;

        match faces.first() {
            Some(face) if face.landmarks.is_some() => {
                Ok(self.recognizer.extract(image, face)?)
            }
            _ => {
                tracing::debug!("no face localized; embedding whole frame");
                Ok(self.recognizer.extract_unaligned(image)?)
            }
        }
    }
}
