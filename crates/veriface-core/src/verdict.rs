//! Risk scoring and the final verification verdict.

use crate::types::FaceMatch;
use serde::{Deserialize, Serialize};

/// Penalty applied when the selfie does not match the document photo.
pub const FACE_MISMATCH_PENALTY: u32 = 60;

/// Penalty applied when the document yields almost no readable text.
pub const SPARSE_TEXT_PENALTY: u32 = 20;

/// Risk scores at or above this are rejected.
pub const REJECT_THRESHOLD: u32 = 50;

/// Minimum trimmed character count for the text to count as readable.
pub const MIN_TEXT_CHARS: usize = 10;

/// Maximum length of the OCR text echoed back in the response.
pub const OCR_TEXT_LIMIT: usize = 500;

/// Final accept/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Verified,
    Rejected,
}

/// The verification outcome returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    pub risk_score: u32,
    pub ocr_text: String,
    pub face_verified: bool,
    pub face_distance: f32,
}

/// Combine the OCR and face-match signals into a verdict.
///
/// Risk starts at zero and accumulates fixed penalties; the only reachable
/// scores are 0, 20, 60 and 80.
pub fn assess(extracted_text: &str, face: &FaceMatch) -> Verdict {
    let mut risk_score = 0u32;

    if !face.verified {
        risk_score += FACE_MISMATCH_PENALTY;
    }
    if extracted_text.trim().chars().count() < MIN_TEXT_CHARS {
        risk_score += SPARSE_TEXT_PENALTY;
    }

    let status = if risk_score < REJECT_THRESHOLD {
        Status::Verified
    } else {
        Status::Rejected
    };

    Verdict {
        status,
        risk_score,
        ocr_text: truncate_chars(extracted_text, OCR_TEXT_LIMIT),
        face_verified: face.verified,
        face_distance: face.distance,
    }
}

/// Truncate to the first `limit` characters (char-boundary safe).
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
