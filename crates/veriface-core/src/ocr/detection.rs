//! PP-OCR text detection via ONNX Runtime.
//!
//! The detection model outputs a per-pixel text probability map (DB head).
//! Regions are recovered by thresholding and connected-component grouping,
//! then sorted into reading order.

use super::OcrError;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DET_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Minimum connected-component size, in probability-map pixels.
const MIN_REGION_PIXELS: usize = 10;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A detected text box in detection input space.
#[derive(Debug, Clone)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// PP-OCR text detection model.
pub struct TextDetector {
    session: Session,
}

impl TextDetector {
    /// Load the detection ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, OcrError> {
        if !Path::new(model_path).exists() {
            return Err(DetectionError::ModelNotFound(model_path.to_string()).into());
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded OCR detection model"
        );

        Ok(Self { session })
    }

    /// Detect text regions in a preprocessed [1, 3, H, W] tensor.
    ///
    /// Returned boxes are in detection input space, sorted top-to-bottom then
    /// left-to-right.
    pub fn detect(&mut self, input: &Array4<f32>) -> Result<Vec<TextBox>, OcrError> {
        let input_h = input.shape()[2];
        let input_w = input.shape()[3];

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (shape, probs) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::InferenceFailed(format!("probability map: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        // Probability map is [1, 1, H, W] or [1, H, W]; leading dims are 1,
        // so the data is a flat H*W row-major buffer either way.
        let (prob_h, prob_w) = match dims.as_slice() {
            [1, 1, h, w] | [1, h, w] => (*h, *w),
            other => {
                return Err(DetectionError::InferenceFailed(format!(
                    "unexpected detection output shape: {other:?}"
                ))
                .into())
            }
        };

        if probs.len() < prob_h * prob_w {
            return Err(DetectionError::InferenceFailed(format!(
                "probability map truncated: {} values for {prob_h}x{prob_w}",
                probs.len()
            ))
            .into());
        }

        let boxes = extract_regions(
            probs,
            prob_w,
            prob_h,
            input_w as f32 / prob_w as f32,
            input_h as f32 / prob_h as f32,
            DET_CONFIDENCE_THRESHOLD,
        );

        tracing::debug!(regions = boxes.len(), "text detection complete");

        Ok(boxes)
    }
}

/// Threshold the probability map and group text pixels into boxes via
/// connected components (4-connected flood fill).
fn extract_regions(
    probs: &[f32],
    width: usize,
    height: usize,
    scale_x: f32,
    scale_y: f32,
    threshold: f32,
) -> Vec<TextBox> {
    let mut visited = vec![false; width * height];
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if visited[idx] || probs[idx] < threshold {
                continue;
            }

            let component = flood_fill(probs, &mut visited, x, y, width, height, threshold);

            if component.count >= MIN_REGION_PIXELS {
                boxes.push(TextBox {
                    x: component.min_x as f32 * scale_x,
                    y: component.min_y as f32 * scale_y,
                    width: (component.max_x - component.min_x + 1) as f32 * scale_x,
                    height: (component.max_y - component.min_y + 1) as f32 * scale_y,
                    confidence: component.sum_prob / component.count as f32,
                });
            }
        }
    }

    // Reading order: top to bottom, then left to right.
    boxes.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    boxes
}

struct Component {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum_prob: f32,
}

fn flood_fill(
    probs: &[f32],
    visited: &mut [bool],
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    threshold: f32,
) -> Component {
    let mut stack = vec![(start_x, start_y)];
    let mut c = Component {
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        count: 0,
        sum_prob: 0.0,
    };

    while let Some((x, y)) = stack.pop() {
        let idx = y * width + x;
        if visited[idx] || probs[idx] < threshold {
            continue;
        }

        visited[idx] = true;
        c.count += 1;
        c.sum_prob += probs[idx];
        c.min_x = c.min_x.min(x);
        c.max_x = c.max_x.max(x);
        c.min_y = c.min_y.min(y);
        c.max_y = c.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    c
}
