//! Configuration structures and constants for the redacto-core library.
//!
//! This module provides the configuration of a redaction run: which detector
//! to use and how it is tuned, the blur applied to detected regions, where
//! frames are staged, and how the final video is encoded. A
//! [`PipelineConfig`] is built once, validated once, and never mutated while
//! a run is in progress.

mod builder;
pub mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use builder::PipelineConfigBuilder;

// Default constants

/// Default Haar cascade file for frontal faces.
pub const DEFAULT_CLASSIFIER_PATH: &str = "haarcascade_frontalface_default.xml";

/// Default ONNX face-detection model.
pub const DEFAULT_MODEL_PATH: &str = "yolov8n-face.onnx";

/// Pyramid step between successive cascade scales.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;

/// Overlapping raw hits a cascade detection needs before it is reported.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;

/// Smallest cascade window side, in pixels.
pub const DEFAULT_MIN_SIZE: u32 = 50;

/// Minimum neural detection score kept.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// IoU above which overlapping neural boxes are suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Square input side of the neural model.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Blur kernel used with the cascade detector.
pub const DEFAULT_CASCADE_KERNEL: u32 = 41;

/// Blur sigma used with the cascade detector.
pub const DEFAULT_CASCADE_SIGMA: f32 = 30.0;

/// Blur kernel used with the neural detector.
pub const DEFAULT_NEURAL_KERNEL: u32 = 51;

/// Blur sigma used with the neural detector.
pub const DEFAULT_NEURAL_SIGMA: f32 = 40.0;

/// Frames processed per batch. 1 keeps the run strictly sequential.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default base directory for per-run staging directories.
pub const DEFAULT_STAGING_DIR: &str = ".";

/// Frame rate used when neither an override nor the source provides one.
pub const FALLBACK_FRAME_RATE: f64 = 24.0;

// Environment variables that fill defaults when the matching flag is absent.
pub const ENV_STAGING_DIR: &str = "REDACTO_STAGING_DIR";
pub const ENV_ENCODER_THREADS: &str = "REDACTO_ENCODER_THREADS";
pub const ENV_BATCH_SIZE: &str = "REDACTO_BATCH_SIZE";

/// Parameters of the Haar cascade detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    /// Path to an OpenCV-format cascade XML file
    pub classifier_path: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: u32,
}

impl CascadeParams {
    pub fn new(classifier_path: impl Into<PathBuf>) -> Self {
        Self {
            classifier_path: classifier_path.into(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFIER_PATH)
    }
}

/// Parameters of the neural (YOLO-style ONNX) detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralParams {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Detections scoring below this are discarded. Range (0, 1].
    pub confidence: f32,
    pub iou_threshold: f32,
    pub input_size: u32,
}

impl NeuralParams {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

/// Detection strategy, selected once at configuration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectorConfig {
    Cascade(CascadeParams),
    Neural(NeuralParams),
}

impl DetectorConfig {
    /// Blur kernel size and sigma used when none are given explicitly.
    pub fn default_blur(&self) -> (u32, f32) {
        match self {
            DetectorConfig::Cascade(_) => (DEFAULT_CASCADE_KERNEL, DEFAULT_CASCADE_SIGMA),
            DetectorConfig::Neural(_) => (DEFAULT_NEURAL_KERNEL, DEFAULT_NEURAL_SIGMA),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectorConfig::Cascade(_) => "cascade",
            DetectorConfig::Neural(_) => "neural",
        }
    }
}

/// Gaussian blur applied to every detected region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurParameters {
    /// Square kernel side. Always odd and at least 1.
    pub kernel_size: u32,
    pub sigma: f32,
}

impl BlurParameters {
    /// Builds blur parameters, rounding an even kernel up to the next odd size.
    ///
    /// This is the only place kernel parity is corrected: `0` becomes `1`,
    /// `40` becomes `41`, odd sizes are kept.
    pub fn normalized(kernel_size: u32, sigma: f32) -> CoreResult<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(CoreError::Configuration(format!(
                "blur sigma must be a positive number, got {sigma}"
            )));
        }
        let kernel_size = if kernel_size % 2 == 0 {
            kernel_size.saturating_add(1)
        } else {
            kernel_size
        };
        Ok(Self { kernel_size, sigma })
    }

    pub fn is_valid(&self) -> bool {
        self.kernel_size % 2 == 1 && self.sigma.is_finite() && self.sigma > 0.0
    }
}

/// Codec settings for the final encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EncoderProfile {
    /// Software HEVC through libx265
    X265 {
        crf: u8,
        preset: String,
        bitrate: String,
    },
    /// NVIDIA hardware HEVC
    Nvenc { cq: u8, preset: String, tune: String },
}

impl EncoderProfile {
    pub fn x265() -> Self {
        EncoderProfile::X265 {
            crf: 12,
            preset: "slow".to_string(),
            bitrate: "10M".to_string(),
        }
    }

    pub fn nvenc() -> Self {
        EncoderProfile::Nvenc {
            cq: 16,
            preset: "slow".to_string(),
            tune: "hq".to_string(),
        }
    }

    pub fn codec(&self) -> &'static str {
        match self {
            EncoderProfile::X265 { .. } => "libx265",
            EncoderProfile::Nvenc { .. } => "hevc_nvenc",
        }
    }
}

impl Default for EncoderProfile {
    fn default() -> Self {
        Self::x265()
    }
}

/// What happens to the staging directory when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingPolicy {
    /// Keep staged frames on failure for inspection. Successful runs always
    /// remove them.
    pub retain_on_failure: bool,
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self {
            retain_on_failure: true,
        }
    }
}

/// Complete configuration of one redaction run.
///
/// Usually created through [`PipelineConfigBuilder`], which resolves
/// detector-specific blur defaults and validates the result.
///
/// # Examples
///
/// ```rust,no_run
/// use redacto_core::config::{CascadeParams, DetectorConfig, PipelineConfigBuilder};
///
/// let config = PipelineConfigBuilder::new("input.mp4", "output.mp4")
///     .detector(DetectorConfig::Cascade(CascadeParams::default()))
///     .blur_kernel(Some(40))
///     .build()
///     .unwrap();
/// assert_eq!(config.blur.kernel_size, 41);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub detector: DetectorConfig,
    pub blur: BlurParameters,
    /// Base directory in which the per-run staging directory is created
    pub staging_dir: PathBuf,
    /// Frame rate for the output. Falls back to the source metadata.
    pub frame_rate_override: Option<f64>,
    pub encoder: EncoderProfile,
    pub encoder_threads: usize,
    pub staging_policy: StagingPolicy,
    pub batch_size: usize,
}

impl PipelineConfig {
    /// Checks every field once, before any frame work begins.
    pub fn validate(&self) -> CoreResult<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(config_error("input path must not be empty"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(config_error("output path must not be empty"));
        }
        if self.input_path == self.output_path {
            return Err(config_error("output path must differ from the input path"));
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(config_error(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }
        if self.staging_dir.exists() && !self.staging_dir.is_dir() {
            return Err(config_error(format!(
                "staging path is not a directory: {}",
                self.staging_dir.display()
            )));
        }

        if let Some(rate) = self.frame_rate_override {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(config_error(format!(
                    "frame rate must be a positive number, got {rate}"
                )));
            }
        }

        if !self.blur.is_valid() {
            return Err(config_error(format!(
                "blur kernel must be odd with a positive sigma, got kernel {} sigma {}",
                self.blur.kernel_size, self.blur.sigma
            )));
        }

        if self.encoder_threads == 0 {
            return Err(config_error("encoder threads must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(config_error("batch size must be at least 1"));
        }

        match &self.detector {
            DetectorConfig::Cascade(params) => validate_cascade(params),
            DetectorConfig::Neural(params) => validate_neural(params),
        }
    }
}

fn validate_cascade(params: &CascadeParams) -> CoreResult<()> {
    if !params.scale_factor.is_finite() || params.scale_factor <= 1.0 {
        return Err(config_error(format!(
            "cascade scale factor must be greater than 1.0, got {}",
            params.scale_factor
        )));
    }
    if params.min_size == 0 {
        return Err(config_error("cascade minimum size must be at least 1"));
    }
    Ok(())
}

fn validate_neural(params: &NeuralParams) -> CoreResult<()> {
    if !(params.confidence > 0.0 && params.confidence <= 1.0) {
        return Err(config_error(format!(
            "confidence threshold must be in (0, 1], got {}",
            params.confidence
        )));
    }
    if !(params.iou_threshold > 0.0 && params.iou_threshold <= 1.0) {
        return Err(config_error(format!(
            "IoU threshold must be in (0, 1], got {}",
            params.iou_threshold
        )));
    }
    if params.input_size == 0 || params.input_size % 32 != 0 {
        return Err(config_error(format!(
            "model input size must be a positive multiple of 32, got {}",
            params.input_size
        )));
    }
    Ok(())
}

fn config_error(message: impl Into<String>) -> CoreError {
    CoreError::Configuration(message.into())
}
