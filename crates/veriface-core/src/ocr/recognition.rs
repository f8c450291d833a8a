//! PP-OCR text recognition via ONNX Runtime.
//!
//! Recognizes text content from cropped regions using CTC greedy decoding
//! against a character dictionary.

use super::OcrError;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// CTC blank token index.
const CTC_BLANK: usize = 0;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("character dictionary not found: {0}")]
    DictionaryNotFound(String),
    #[error("failed to read character dictionary: {0}")]
    DictionaryRead(#[from] std::io::Error),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Recognized text with an overall confidence.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-character probability (0.0-1.0); 0.0 when nothing decoded.
    pub confidence: f32,
}

/// PP-OCR text recognition model.
pub struct TextRecognizer {
    session: Session,
    dictionary: Vec<char>,
}

impl TextRecognizer {
    /// Load the recognition ONNX model and its character dictionary.
    pub fn load(model_path: &str, dict_path: &str) -> Result<Self, OcrError> {
        if !Path::new(model_path).exists() {
            return Err(RecognitionError::ModelNotFound(model_path.to_string()).into());
        }
        if !Path::new(dict_path).exists() {
            return Err(RecognitionError::DictionaryNotFound(dict_path.to_string()).into());
        }

        let dictionary = load_dictionary(dict_path).map_err(RecognitionError::from)?;

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            dictionary_chars = dictionary.len(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            "loaded OCR recognition model"
        );

        Ok(Self { session, dictionary })
    }

    /// Recognize text from a preprocessed [1, 3, H, W] crop tensor.
    pub fn recognize(&mut self, input: &Array4<f32>) -> Result<RecognizedText, OcrError> {
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognitionError::InferenceFailed(format!("sequence output: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        // Sequence output is [1, T, C] or [T, C]; flat row-major either way.
        let (seq_len, num_classes) = match dims.as_slice() {
            [1, t, c] | [t, c] => (*t, *c),
            other => {
                return Err(RecognitionError::InferenceFailed(format!(
                    "unexpected recognition output shape: {other:?}"
                ))
                .into())
            }
        };

        let (text, confidence) = ctc_decode(logits, seq_len, num_classes, &self.dictionary);

        Ok(RecognizedText { text, confidence })
    }
}

/// Load a character dictionary: one character per line, blank token at
/// index 0. A space is appended when the file does not contain one.
fn load_dictionary(path: &str) -> Result<Vec<char>, std::io::Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut dictionary = vec!['\0']; // index 0 is the CTC blank

    for line in reader.lines() {
        if let Some(ch) = line?.chars().next() {
            dictionary.push(ch);
        }
    }

    if !dictionary.contains(&' ') {
        dictionary.push(' ');
    }

    Ok(dictionary)
}

/// CTC greedy (best-path) decoding with blank removal and repeat collapsing.
///
/// `probs` is a flat [seq_len, num_classes] row-major probability matrix.
/// Returns the decoded text and the mean probability of emitted characters.
fn ctc_decode(
    probs: &[f32],
    seq_len: usize,
    num_classes: usize,
    dictionary: &[char],
) -> (String, f32) {
    let mut text = String::new();
    let mut total_prob = 0.0f32;
    let mut emitted = 0usize;
    let mut prev_index: Option<usize> = None;

    for t in 0..seq_len {
        let row = &probs[t * num_classes..(t + 1) * num_classes];

        let mut max_prob = f32::NEG_INFINITY;
        let mut max_index = 0usize;
        for (c, &p) in row.iter().enumerate() {
            if p > max_prob {
                max_prob = p;
                max_index = c;
            }
        }

        // Skip blanks and collapsed repeats.
        if max_index != CTC_BLANK && Some(max_index) != prev_index {
            if let Some(&ch) = dictionary.get(max_index) {
                text.push(ch);
                total_prob += max_prob;
                emitted += 1;
            }
        }

        prev_index = if max_index == CTC_BLANK {
            None
        } else {
            Some(max_index)
        };
    }

    let confidence = if emitted == 0 {
        0.0
    } else {
        (total_prob / emitted as f32).clamp(0.0, 1.0)
    };

    (text, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dictionary: blank, 'a', 'b', 'c'.
    fn dict() -> Vec<char> {
        vec!['\0', 'a', 'b', 'c']
    }

    /// Build a [T, C] probability matrix from per-timestep argmax picks.
    fn probs_from_picks(picks: &[(usize, f32)], num_classes: usize) -> Vec<f32> {
        let mut probs = vec![0.0f32; picks.len() * num_classes];
        for (t, &(class, p)) in picks.iter().enumerate() {
            probs[t * num_classes + class] = p;
        }
        probs
    }

    #[test]
    fn test_ctc_decode_simple() {
        // a, b, c with no blanks or repeats.
        let probs = probs_from_picks(&[(1, 0.9), (2, 0.8), (3, 0.7)], 4);
        let (text, conf) = ctc_decode(&probs, 3, 4, &dict());
        assert_eq!(text, "abc");
        assert!((conf - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_ctc_decode_collapses_repeats() {
        // a a b b → "ab"
        let probs = probs_from_picks(&[(1, 0.9), (1, 0.9), (2, 0.8), (2, 0.8)], 4);
        let (text, _) = ctc_decode(&probs, 4, 4, &dict());
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_ctc_decode_blank_separates_repeats() {
        // a blank a → "aa"
        let probs = probs_from_picks(&[(1, 0.9), (0, 0.9), (1, 0.9)], 4);
        let (text, _) = ctc_decode(&probs, 3, 4, &dict());
        assert_eq!(text, "aa");
    }

    #[test]
    fn test_ctc_decode_all_blanks() {
        let probs = probs_from_picks(&[(0, 0.9), (0, 0.9)], 4);
        let (text, conf) = ctc_decode(&probs, 2, 4, &dict());
        assert!(text.is_empty());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn test_ctc_decode_out_of_dictionary_index() {
        // Class 7 has no dictionary entry; it must be skipped, not panic.
        let probs = probs_from_picks(&[(1, 0.9), (7, 0.9)], 8);
        let (text, _) = ctc_decode(&probs, 2, 8, &dict());
        assert_eq!(text, "a");
    }

    #[test]
    fn test_ctc_decode_empty_sequence() {
        let (text, conf) = ctc_decode(&[], 0, 4, &dict());
        assert!(text.is_empty());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn test_load_dictionary() {
        let dir = std::env::temp_dir().join("veriface-dict-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("keys.txt");
        std::fs::write(&path, "a\nb\nc\n").unwrap();

        let dict = load_dictionary(path.to_str().unwrap()).unwrap();
        // blank + a, b, c + appended space
        assert_eq!(dict, vec!['\0', 'a', 'b', 'c', ' ']);
    }
}
