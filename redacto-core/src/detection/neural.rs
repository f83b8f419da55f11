// ============================================================================
// redacto-core/src/detection/neural.rs
// ============================================================================
//
// NEURAL DETECTOR: YOLO-style face detection through ONNX Runtime
//
// Per frame:
// 1. Letterbox the frame into a square model input (aspect preserved, grey
//    padding) and convert to an NCHW float tensor in [0, 1]
// 2. Run the model through an InferenceBackend
// 3. Decode the [1, 4 + 1 (+ landmarks), N] output into scored boxes
// 4. Drop boxes below the confidence threshold and apply greedy NMS
// 5. Undo the letterbox to get frame coordinates
//
// The backend trait keeps steps 1 and 3-5 testable without a model file.
//
// AI-ASSISTANT-INFO: ONNX Runtime RegionDetector implementation

use std::path::Path;
use std::sync::Mutex;

use image::imageops::{FilterType, replace, resize};
use image::{Rgb, RgbImage};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;

use super::{DetectionResult, RegionDetector};
use crate::config::NeuralParams;
use crate::error::{CoreError, CoreResult};
use crate::geometry::Region;
use crate::media::Frame;

/// Letterbox padding value, matching the training pipeline of YOLO models.
const PAD_VALUE: u8 = 114;

/// Upper bound on boxes kept after NMS.
const MAX_DETECTIONS: usize = 300;

/// Runs a model on one NCHW `[1, 3, size, size]` input.
pub trait InferenceBackend: Send + Sync {
    /// Returns the output shape and its row-major data.
    fn infer(&self, input: Vec<f32>, size: u32) -> Result<(Vec<usize>, Vec<f32>), String>;
}

/// [`InferenceBackend`] backed by an ONNX Runtime session.
pub struct OrtBackend {
    session: Mutex<Session>,
}

impl OrtBackend {
    pub fn load(model_path: &Path) -> CoreResult<Self> {
        let model_error = |reason: String| CoreError::ModelLoad {
            path: model_path.display().to_string(),
            reason,
        };

        if !model_path.is_file() {
            return Err(model_error("file not found".to_string()));
        }

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| model_error(e.to_string()))?;

        log::debug!("Loaded ONNX model {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn infer(&self, input: Vec<f32>, size: u32) -> Result<(Vec<usize>, Vec<f32>), String> {
        let shape = [1usize, 3, size as usize, size as usize];
        let tensor = Tensor::from_array((shape, input.into_boxed_slice()))
            .map_err(|e| format!("failed to create input tensor: {e}"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| "inference session lock poisoned".to_string())?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| format!("inference failed: {e}"))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| "model produced no outputs".to_string())?;
        let (out_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("failed to read output tensor: {e}"))?;

        Ok((out_shape.iter().map(|&d| d.max(0) as usize).collect(), data.to_vec()))
    }
}

/// Placement of the frame inside the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale, size);
        Self {
            scale,
            pad_x: (size - new_w) / 2,
            pad_y: (size - new_h) / 2,
        }
    }

    /// Maps a model-space x coordinate back into the frame.
    fn unmap_x(&self, v: f32) -> f32 {
        (v - self.pad_x as f32) / self.scale
    }

    fn unmap_y(&self, v: f32) -> f32 {
        (v - self.pad_y as f32) / self.scale
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32, size: u32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    (new_w, new_h)
}

/// Letterboxes `image` into a `size x size` NCHW tensor with values in [0, 1].
pub fn preprocess(image: &RgbImage, size: u32) -> (Vec<f32>, Letterbox) {
    let letterbox = Letterbox::new(image.width(), image.height(), size);
    let (new_w, new_h) = scaled_dims(image.width(), image.height(), letterbox.scale, size);

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    let resized = resize(image, new_w, new_h, FilterType::Triangle);
    replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.pad_x),
        i64::from(letterbox.pad_y),
    );

    let plane = (size * size) as usize;
    let mut tensor = vec![0f32; 3 * plane];
    for (idx, px) in canvas.as_raw().chunks_exact(3).enumerate() {
        tensor[idx] = f32::from(px[0]) / 255.0;
        tensor[plane + idx] = f32::from(px[1]) / 255.0;
        tensor[2 * plane + idx] = f32::from(px[2]) / 255.0;
    }
    (tensor, letterbox)
}

/// A scored box in model-input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl ScoredBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &ScoredBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Decodes a YOLO face output into boxes scoring at least `confidence`.
///
/// Accepts `[1, C, N]` (channel-major, the usual export) and `[1, N, C]`
/// layouts; channels are `cx, cy, w, h, score` followed by optional
/// landmark values, which are ignored.
pub fn decode_output(shape: &[usize], data: &[f32], confidence: f32) -> Result<Vec<ScoredBox>, String> {
    let (rows, cols) = match shape {
        [1, a, b] | [a, b] => (*a, *b),
        _ => return Err(format!("unexpected output shape {shape:?}")),
    };
    if rows * cols != data.len() {
        return Err(format!(
            "output shape {shape:?} does not match {} values",
            data.len()
        ));
    }

    // Fewer channels than anchors in any real model.
    let channel_major = rows <= cols;
    let (channels, anchors) = if channel_major { (rows, cols) } else { (cols, rows) };
    if channels < 5 {
        return Err(format!("output has {channels} channels, expected at least 5"));
    }

    let value = |channel: usize, anchor: usize| {
        if channel_major {
            data[channel * anchors + anchor]
        } else {
            data[anchor * channels + channel]
        }
    };

    let boxes = (0..anchors)
        .filter_map(|i| {
            let score = value(4, i);
            if !(score >= confidence) {
                return None;
            }
            let (cx, cy, w, h) = (value(0, i), value(1, i), value(2, i), value(3, i));
            Some(ScoredBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                score,
            })
        })
        .collect();
    Ok(boxes)
}

/// Greedy non-maximum suppression, highest score first.
pub fn non_max_suppression(mut boxes: Vec<ScoredBox>, iou_threshold: f32) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<ScoredBox> = Vec::new();
    for candidate in boxes {
        if kept.len() == MAX_DETECTIONS {
            break;
        }
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// YOLO-style face [`RegionDetector`].
pub struct NeuralDetector {
    backend: Box<dyn InferenceBackend>,
    confidence: f32,
    iou_threshold: f32,
    input_size: u32,
}

impl NeuralDetector {
    pub fn new(backend: Box<dyn InferenceBackend>, params: &NeuralParams) -> Self {
        Self {
            backend,
            confidence: params.confidence,
            iou_threshold: params.iou_threshold,
            input_size: params.input_size,
        }
    }

    /// Loads the ONNX model named in `params`.
    pub fn from_params(params: &NeuralParams) -> CoreResult<Self> {
        let backend = OrtBackend::load(&params.model_path)?;
        Ok(Self::new(Box::new(backend), params))
    }
}

impl RegionDetector for NeuralDetector {
    fn name(&self) -> &'static str {
        "neural"
    }

    fn detect(&self, frame: &Frame) -> CoreResult<DetectionResult> {
        let detection_error = |reason: String| CoreError::Detection {
            index: frame.index,
            reason,
        };

        let (input, letterbox) = preprocess(&frame.image, self.input_size);
        let (shape, data) = self
            .backend
            .infer(input, self.input_size)
            .map_err(detection_error)?;
        let candidates = decode_output(&shape, &data, self.confidence).map_err(detection_error)?;
        let kept = non_max_suppression(candidates, self.iou_threshold);

        log::debug!("Frame {}: {} face(s) above threshold after NMS", frame.index, kept.len());

        Ok(DetectionResult::from_candidates(
            kept.iter().map(|b| {
                let region = Region::from_corners(
                    letterbox.unmap_x(b.x1),
                    letterbox.unmap_y(b.y1),
                    letterbox.unmap_x(b.x2),
                    letterbox.unmap_y(b.y2),
                );
                (region, Some(b.score))
            }),
            frame.width(),
            frame.height(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a fixed `[1, 5, N]` output built from model-space boxes.
    struct FixedBackend {
        boxes: Vec<(f32, f32, f32, f32, f32)>,
    }

    impl InferenceBackend for FixedBackend {
        fn infer(&self, input: Vec<f32>, size: u32) -> Result<(Vec<usize>, Vec<f32>), String> {
            assert_eq!(input.len(), 3 * (size * size) as usize);
            let n = self.boxes.len();
            let mut data = vec![0f32; 5 * n];
            for (i, &(cx, cy, w, h, s)) in self.boxes.iter().enumerate() {
                data[i] = cx;
                data[n + i] = cy;
                data[2 * n + i] = w;
                data[3 * n + i] = h;
                data[4 * n + i] = s;
            }
            Ok((vec![1, 5, n], data))
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn infer(&self, _input: Vec<f32>, _size: u32) -> Result<(Vec<usize>, Vec<f32>), String> {
            Err("device lost".to_string())
        }
    }

    fn detector(boxes: Vec<(f32, f32, f32, f32, f32)>, confidence: f32) -> NeuralDetector {
        let params = NeuralParams {
            confidence,
            ..NeuralParams::default()
        };
        NeuralDetector::new(Box::new(FixedBackend { boxes }), &params)
    }

    fn frame() -> Frame {
        Frame::new(7, RgbImage::from_pixel(320, 240, Rgb([30, 60, 90])))
    }

    #[test]
    fn test_letterbox_geometry() {
        let lb = Letterbox::new(320, 240, 640);
        assert_eq!(lb.scale, 2.0);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 80));
    }

    #[test]
    fn test_preprocess_pads_with_grey_and_normalises() {
        let (tensor, _) = preprocess(&frame().image, 640);
        assert_eq!(tensor.len(), 3 * 640 * 640);
        // Top-left corner lies in the padding band.
        assert!((tensor[0] - 114.0 / 255.0).abs() < 1e-6);
        // Centre pixel comes from the frame.
        let centre = 320 * 640 + 320;
        assert!((tensor[centre] - 30.0 / 255.0).abs() < 1e-6);
        assert!((tensor[640 * 640 + centre] - 60.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_boxes_map_back_to_frame_coordinates() {
        // Frame box (100, 50)-(140, 100) at scale 2 with 80px vertical padding.
        let det = detector(vec![(240.0, 230.0, 80.0, 100.0, 0.9)], 0.5);
        let result = det.detect(&frame()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.detections[0].region, Region::new(100, 50, 140, 100));
        assert_eq!(result.detections[0].confidence, Some(0.9));
    }

    #[test]
    fn test_detections_below_threshold_are_dropped() {
        let det = detector(vec![(240.0, 230.0, 80.0, 100.0, 0.4)], 0.9);
        assert!(det.detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_boxes_are_suppressed() {
        let det = detector(
            vec![
                (240.0, 230.0, 80.0, 100.0, 0.8),
                (242.0, 231.0, 80.0, 100.0, 0.95),
                (500.0, 300.0, 40.0, 40.0, 0.6),
            ],
            0.5,
        );
        let result = det.detect(&frame()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.detections[0].confidence, Some(0.95));
        assert_eq!(result.detections[1].confidence, Some(0.6));
    }

    #[test]
    fn test_box_in_padding_is_discarded() {
        // Entirely inside the top padding band.
        let det = detector(vec![(320.0, 20.0, 40.0, 20.0, 0.9)], 0.5);
        let result = det.detect(&frame()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.discarded, 1);
    }

    #[test]
    fn test_backend_failure_is_detection_error() {
        let det = NeuralDetector::new(Box::new(FailingBackend), &NeuralParams::default());
        match det.detect(&frame()) {
            Err(CoreError::Detection { index, reason }) => {
                assert_eq!(index, 7);
                assert!(reason.contains("device lost"));
            }
            other => panic!("expected detection error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_accepts_anchor_major_layout() {
        // Twenty anchors of five channels each, [1, N, C].
        let mut data = vec![0f32; 20 * 5];
        data[..5].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.7]);
        data[5..10].copy_from_slice(&[50.0, 50.0, 8.0, 8.0, 0.2]);
        let boxes = decode_output(&[1, 20, 5], &data, 0.5).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!((boxes[0].x1, boxes[0].y2), (8.0, 12.0));
    }

    #[test]
    fn test_decode_rejects_mismatched_shapes() {
        assert!(decode_output(&[1, 5, 4], &[0.0; 10], 0.5).is_err());
        assert!(decode_output(&[1, 2, 3, 4], &[0.0; 24], 0.5).is_err());
    }
}
