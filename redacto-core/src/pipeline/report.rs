//! Summary of a completed run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Totals reported after the output file is in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub frames_processed: u64,
    pub regions_redacted: u64,
    /// Frames in which at least one region was blurred
    pub frames_with_regions: u64,
    /// Detector candidates dropped for lying outside the frame
    pub discarded_regions: u64,
    pub frame_rate: f64,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Frames per second of wall-clock time over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Per-frame counters accumulated while streaming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunTotals {
    pub frames: u64,
    pub regions: u64,
    pub frames_with_regions: u64,
    pub discarded: u64,
}

impl RunTotals {
    pub fn record(&mut self, regions: usize, discarded: usize) {
        self.frames += 1;
        self.regions += regions as u64;
        self.discarded += discarded as u64;
        if regions > 0 {
            self.frames_with_regions += 1;
        }
    }
}
