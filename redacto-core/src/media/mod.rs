//! Frame source module
//!
//! Decoded video enters the pipeline through the [`FrameSource`] trait: a
//! forward-only stream of RGB frames with contiguous indices starting at 0,
//! plus the stream metadata probed when the source was opened. The
//! production implementation probes with ffprobe and decodes with ffmpeg;
//! tests substitute in-memory sources.

pub mod decoder;
#[cfg(feature = "opencv")]
pub mod mat;
pub mod probe;

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

pub use decoder::{FfmpegFrameSource, FfmpegSourceOpener};
pub use probe::probe_stream;

/// One decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the stream, starting at 0
    pub index: u64,
    /// 8-bit RGB pixels
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Properties of the video stream read at open time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Frames per second, when the container reports a usable rate
    pub frame_rate: Option<f64>,
    pub width: u32,
    pub height: u32,
    /// Frame count, when the container reports one
    pub total_frames: Option<u64>,
}

/// Forward-only stream of decoded frames.
pub trait FrameSource {
    fn metadata(&self) -> &StreamMetadata;

    /// Returns the next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> CoreResult<Option<Frame>>;
}

/// Opens a [`FrameSource`] for a path.
pub trait SourceOpener {
    type Source: FrameSource;

    fn open(&self, path: &Path) -> CoreResult<Self::Source>;
}
