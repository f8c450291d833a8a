//! The combined verification pipeline: OCR + face match + risk scoring.

use crate::face::{FaceMatchError, FaceMatcher};
use crate::ocr::{self, OcrEngine};
use crate::types::FaceMatch;
use crate::verdict::{self, Verdict};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("face models: {0}")]
    Face(#[from] FaceMatchError),
    #[error("ocr models: {0}")]
    Ocr(#[from] ocr::OcrError),
}

/// Locations of the five model artifacts the pipeline needs.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub face_detection: PathBuf,
    pub face_recognition: PathBuf,
    pub ocr_detection: PathBuf,
    pub ocr_recognition: PathBuf,
    pub ocr_dictionary: PathBuf,
}

impl ModelPaths {
    /// Standard file names under a single model directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            face_detection: dir.join("det_10g.onnx"),
            face_recognition: dir.join("w600k_r50.onnx"),
            ocr_detection: dir.join("det_model.onnx"),
            ocr_recognition: dir.join("rec_model.onnx"),
            ocr_dictionary: dir.join("ppocr_keys_v1.txt"),
        }
    }
}

/// Owns the loaded OCR and face-matching engines.
///
/// Models are loaded once at construction (fail-fast) and reused for every
/// verification. Inference takes `&mut self`; callers that serve concurrent
/// requests put the verifier on a dedicated thread.
pub struct Verifier {
    ocr: OcrEngine,
    matcher: FaceMatcher,
}

impl Verifier {
    pub fn load(paths: &ModelPaths, similarity_threshold: f32) -> Result<Self, VerifierError> {
        let ocr = OcrEngine::load(
            &paths.ocr_detection.to_string_lossy(),
            &paths.ocr_recognition.to_string_lossy(),
            &paths.ocr_dictionary.to_string_lossy(),
        )?;
        let matcher = FaceMatcher::load(
            &paths.face_detection.to_string_lossy(),
            &paths.face_recognition.to_string_lossy(),
            similarity_threshold,
        )?;
        Ok(Self { ocr, matcher })
    }

    /// Verify a document/selfie pair.
    ///
    /// Both engine failures are absorbed, never propagated:
    /// - an OCR failure counts as a blank document (raising the risk score);
    /// - a face-match failure maps to [`FaceMatch::fail_closed`].
    pub fn verify(&mut self, document: &RgbImage, selfie: &RgbImage) -> Verdict {
        let spans = self.ocr.read_text(document).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ocr failed; treating document as blank");
            Vec::new()
        });
        let extracted_text = ocr::join_text(&spans);

        let face: FaceMatch = self.matcher.compare(selfie, document).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "face match failed; treating as not verified");
            FaceMatch::fail_closed()
        });

        verdict::assess(&extracted_text, &face)
    }
}
