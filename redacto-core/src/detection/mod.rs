//! Region detection.
//!
//! A [`RegionDetector`] locates regions to redact in a single frame. Two
//! strategies are provided and selected once at configuration time through
//! [`build_detector`]:
//!
//! - [`CascadeDetector`]: OpenCV Haar cascade classifier loaded from an
//!   OpenCV-format XML file
//! - [`NeuralDetector`]: YOLO-style face model run through ONNX Runtime
//!
//! Detectors never mutate the frame. Every candidate box is clipped to the
//! frame before it is returned; candidates with no area left are counted as
//! discarded and never reach the redactor.

pub mod cascade;
pub mod neural;

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::error::CoreResult;
use crate::geometry::Region;
use crate::media::Frame;

pub use cascade::CascadeDetector;
pub use neural::{InferenceBackend, NeuralDetector, OrtBackend};

/// One detected region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Clipped to the frame, never empty
    pub region: Region,
    /// Model score. Cascade detections carry none.
    pub confidence: Option<f32>,
}

/// Detections for one frame, in detector output order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    /// Candidates dropped because nothing of them lay inside the frame
    pub discarded: usize,
}

impl DetectionResult {
    /// Clips raw candidate boxes to a `width x height` frame.
    pub fn from_candidates<I>(candidates: I, width: u32, height: u32) -> Self
    where
        I: IntoIterator<Item = (Region, Option<f32>)>,
    {
        let mut result = DetectionResult::default();
        for (region, confidence) in candidates {
            match region.clip(width, height) {
                Some(region) => result.detections.push(Detection { region, confidence }),
                None => {
                    log::debug!("Discarding candidate {:?} outside {}x{} frame", region, width, height);
                    result.discarded += 1;
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.detections.iter().map(|d| &d.region)
    }
}

/// Locates regions of interest in a frame.
///
/// Implementations are deterministic for identical input and model. An
/// empty result is valid; an error is fatal for the run, since skipping a
/// frame would leave it unredacted.
pub trait RegionDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, frame: &Frame) -> CoreResult<DetectionResult>;
}

/// Constructs the detector selected by `config`, loading its model once.
pub fn build_detector(config: &DetectorConfig) -> CoreResult<Box<dyn RegionDetector>> {
    match config {
        DetectorConfig::Cascade(params) => {
            log::info!("Loading cascade classifier {}", params.classifier_path.display());
            Ok(Box::new(CascadeDetector::from_params(params)?))
        }
        DetectorConfig::Neural(params) => {
            log::info!("Loading neural model {}", params.model_path.display());
            Ok(Box::new(NeuralDetector::from_params(params)?))
        }
    }
}
