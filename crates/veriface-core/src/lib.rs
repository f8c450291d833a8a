//! veriface-core — Document OCR and face matching engine.
//!
//! Text extraction uses PP-OCR detection/recognition models; face matching
//! uses SCRFD for detection and ArcFace for embeddings, all running via
//! ONNX Runtime for CPU inference.

pub mod face;
pub mod image;
pub mod ocr;
pub mod types;
pub mod verdict;
pub mod verifier;

pub use face::FaceMatcher;
pub use image::decode_image;
pub use ocr::OcrEngine;
pub use types::{Embedding, FaceBox, FaceMatch, TextSpan};
pub use verdict::{Status, Verdict};
pub use verifier::{ModelPaths, Verifier};
