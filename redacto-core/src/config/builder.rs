// ============================================================================
// redacto-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for PipelineConfig
//
// Fluent construction of a PipelineConfig. Optional values fall back to the
// environment (REDACTO_*) and then to the crate defaults. Blur defaults
// depend on the chosen detector, so they are resolved in build(), which also
// normalises the kernel size and validates the finished configuration.
//
// AI-ASSISTANT-INFO: Builder pattern implementation for PipelineConfig

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::utils::{get_env_path, get_env_usize};
use super::{
    BlurParameters, DEFAULT_BATCH_SIZE, DEFAULT_STAGING_DIR, DetectorConfig, ENV_BATCH_SIZE,
    ENV_ENCODER_THREADS, ENV_STAGING_DIR, EncoderProfile, PipelineConfig, StagingPolicy,
};
use crate::error::CoreResult;

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    input_path: PathBuf,
    output_path: PathBuf,
    detector: DetectorConfig,
    blur_kernel: Option<u32>,
    blur_sigma: Option<f32>,
    staging_dir: Option<PathBuf>,
    frame_rate_override: Option<f64>,
    encoder: EncoderProfile,
    encoder_threads: Option<usize>,
    staging_policy: StagingPolicy,
    batch_size: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Starts a builder for the given input and output. The neural detector
    /// with default parameters is selected until [`Self::detector`] is called.
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            detector: DetectorConfig::Neural(Default::default()),
            blur_kernel: None,
            blur_sigma: None,
            staging_dir: None,
            frame_rate_override: None,
            encoder: EncoderProfile::default(),
            encoder_threads: None,
            staging_policy: StagingPolicy::default(),
            batch_size: None,
        }
    }

    pub fn detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Blur kernel size. Even values are rounded up to the next odd size.
    pub fn blur_kernel(mut self, kernel: Option<u32>) -> Self {
        self.blur_kernel = kernel;
        self
    }

    pub fn blur_sigma(mut self, sigma: Option<f32>) -> Self {
        self.blur_sigma = sigma;
        self
    }

    pub fn staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    pub fn frame_rate(mut self, rate: Option<f64>) -> Self {
        self.frame_rate_override = rate;
        self
    }

    pub fn encoder(mut self, profile: EncoderProfile) -> Self {
        self.encoder = profile;
        self
    }

    pub fn encoder_threads(mut self, threads: Option<usize>) -> Self {
        self.encoder_threads = threads;
        self
    }

    pub fn staging_policy(mut self, policy: StagingPolicy) -> Self {
        self.staging_policy = policy;
        self
    }

    pub fn batch_size(mut self, size: Option<usize>) -> Self {
        self.batch_size = size;
        self
    }

    /// Resolves defaults, normalises the blur kernel and validates.
    pub fn build(self) -> CoreResult<PipelineConfig> {
        let (default_kernel, default_sigma) = self.detector.default_blur();
        let blur = BlurParameters::normalized(
            self.blur_kernel.unwrap_or(default_kernel),
            self.blur_sigma.unwrap_or(default_sigma),
        )?;

        let staging_dir = self
            .staging_dir
            .unwrap_or_else(|| get_env_path(ENV_STAGING_DIR, PathBuf::from(DEFAULT_STAGING_DIR)));
        let encoder_threads = self
            .encoder_threads
            .unwrap_or_else(|| get_env_usize(ENV_ENCODER_THREADS, num_cpus::get()));
        let batch_size = self
            .batch_size
            .unwrap_or_else(|| get_env_usize(ENV_BATCH_SIZE, DEFAULT_BATCH_SIZE));

        let config = PipelineConfig {
            input_path: self.input_path,
            output_path: self.output_path,
            detector: self.detector,
            blur,
            staging_dir,
            frame_rate_override: self.frame_rate_override,
            encoder: self.encoder,
            encoder_threads,
            staging_policy: self.staging_policy,
            batch_size,
        };
        config.validate()?;
        Ok(config)
    }
}
