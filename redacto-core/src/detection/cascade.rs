// ============================================================================
// redacto-core/src/detection/cascade.rs
// ============================================================================
//
// CASCADE DETECTOR: Haar cascade region detection through OpenCV
//
// Loads an OpenCV-format cascade XML into a CascadeClassifier and runs
// detectMultiScale over the grayscale frame. Pyramid scanning, window
// variance normalisation and clustering of overlapping hits (a cluster is
// reported only when it holds more than `min_neighbors` raw hits) are all
// OpenCV's.
//
// Built without the `opencv` feature, the detector still checks that the
// classifier file exists and then refuses to start with a configuration
// error.
//
// AI-ASSISTANT-INFO: Haar cascade RegionDetector implementation

#[cfg(feature = "opencv")]
use std::sync::Mutex;

#[cfg(feature = "opencv")]
use image::RgbImage;
#[cfg(feature = "opencv")]
use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgproc,
    objdetect::CascadeClassifier,
    prelude::*,
};

use super::{DetectionResult, RegionDetector};
use crate::config::CascadeParams;
use crate::error::{CoreError, CoreResult};
#[cfg(feature = "opencv")]
use crate::geometry::Region;
use crate::media::Frame;
#[cfg(feature = "opencv")]
use crate::media::mat::rgb_to_mat;

fn model_error(params: &CascadeParams, reason: impl Into<String>) -> CoreError {
    CoreError::ModelLoad {
        path: params.classifier_path.display().to_string(),
        reason: reason.into(),
    }
}

/// Haar cascade [`RegionDetector`].
#[cfg(feature = "opencv")]
pub struct CascadeDetector {
    // detect_multi_scale needs &mut; the classifier is Send but not Sync.
    classifier: Mutex<CascadeClassifier>,
    scale_factor: f64,
    min_neighbors: u32,
    min_size: u32,
}

#[cfg(feature = "opencv")]
impl CascadeDetector {
    /// Loads the classifier named in `params`. Any failure is `ModelLoad`.
    pub fn from_params(params: &CascadeParams) -> CoreResult<Self> {
        let path = &params.classifier_path;
        if !path.is_file() {
            return Err(model_error(params, "file not found"));
        }

        let classifier = CascadeClassifier::new(&path.to_string_lossy())
            .map_err(|e| model_error(params, e.to_string()))?;
        // OpenCV reports an unparseable file as an empty classifier.
        if classifier.empty().map_err(|e| model_error(params, e.to_string()))? {
            return Err(model_error(params, "not a valid OpenCV cascade classifier"));
        }
        log::debug!(
            "Loaded cascade {} (scale factor {}, min neighbors {}, min size {})",
            path.display(),
            params.scale_factor,
            params.min_neighbors,
            params.min_size
        );

        Ok(Self {
            classifier: Mutex::new(classifier),
            scale_factor: params.scale_factor,
            min_neighbors: params.min_neighbors,
            min_size: params.min_size,
        })
    }

    fn run_cascade(&self, gray: &Mat) -> opencv::Result<Vector<Rect>> {
        let mut hits = Vector::<Rect>::new();
        let min_size = self.min_size.min(i32::MAX as u32) as i32;
        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| opencv::Error::new(opencv::core::StsError, "cascade classifier lock poisoned"))?;
        classifier.detect_multi_scale(
            gray,
            &mut hits,
            self.scale_factor,
            self.min_neighbors.min(i32::MAX as u32) as i32,
            0,
            Size::new(min_size, min_size),
            Size::default(),
        )?;
        Ok(hits)
    }
}

/// Grayscale copy of an RGB frame, as the classifier expects.
#[cfg(feature = "opencv")]
fn gray_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let rgb = rgb_to_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY)?;
    Ok(gray)
}

#[cfg(feature = "opencv")]
impl RegionDetector for CascadeDetector {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&self, frame: &Frame) -> CoreResult<DetectionResult> {
        let detection_error = |e: opencv::Error| CoreError::Detection {
            index: frame.index,
            reason: e.to_string(),
        };

        let gray = gray_mat(&frame.image).map_err(detection_error)?;
        let hits = self.run_cascade(&gray).map_err(detection_error)?;
        log::debug!("Frame {}: {} cascade hit(s)", frame.index, hits.len());

        Ok(DetectionResult::from_candidates(
            hits.iter().map(|r| {
                (
                    Region::from_xywh(
                        i64::from(r.x),
                        i64::from(r.y),
                        i64::from(r.width),
                        i64::from(r.height),
                    ),
                    None,
                )
            }),
            frame.width(),
            frame.height(),
        ))
    }
}

/// Haar cascade [`RegionDetector`]. This build has no OpenCV support.
#[cfg(not(feature = "opencv"))]
pub struct CascadeDetector {
    _private: (),
}

#[cfg(not(feature = "opencv"))]
impl CascadeDetector {
    pub fn from_params(params: &CascadeParams) -> CoreResult<Self> {
        if !params.classifier_path.is_file() {
            return Err(model_error(params, "file not found"));
        }
        Err(CoreError::Configuration(
            "the cascade detector requires redacto-core built with the `opencv` feature".to_string(),
        ))
    }
}

#[cfg(not(feature = "opencv"))]
impl RegionDetector for CascadeDetector {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&self, _frame: &Frame) -> CoreResult<DetectionResult> {
        Ok(DetectionResult::default())
    }
}
