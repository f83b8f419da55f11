//! Core library for detection-guided face redaction in video.
//!
//! A run decodes the input with ffmpeg, detects faces in every frame with a
//! Haar cascade or a YOLO-style ONNX model, blurs each detected region with
//! a Gaussian kernel, stages the redacted frames as PNG files and re-encodes
//! them into the output video.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use redacto_core::config::{CascadeParams, DetectorConfig, PipelineConfigBuilder};
//! use redacto_core::external::SidecarSpawner;
//! use redacto_core::media::FfmpegSourceOpener;
//! use redacto_core::Pipeline;
//!
//! let config = PipelineConfigBuilder::new("input.mp4", "redacted.mp4")
//!     .detector(DetectorConfig::Cascade(CascadeParams::default()))
//!     .build()
//!     .unwrap();
//!
//! let mut pipeline = Pipeline::new(config);
//! let report = pipeline.run(&FfmpegSourceOpener, &SidecarSpawner).unwrap();
//! println!("{} regions redacted", report.regions_redacted);
//! ```

pub mod config;
pub mod detection;
pub mod encoding;
pub mod error;
pub mod events;
pub mod external;
pub mod file_logging;
pub mod geometry;
pub mod media;
pub mod pipeline;
pub mod redaction;
pub mod staging;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{
    BlurParameters, DetectorConfig, EncoderProfile, PipelineConfig, PipelineConfigBuilder,
    StagingPolicy,
};
pub use detection::{Detection, DetectionResult, RegionDetector, build_detector};
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventDispatcher, EventHandler, JsonProgressHandler};
pub use geometry::Region;
pub use media::{Frame, FrameSource, SourceOpener, StreamMetadata};
pub use pipeline::{CancellationFlag, Pipeline, PipelineReport, PipelineState};
pub use utils::{format_bytes, format_duration};
