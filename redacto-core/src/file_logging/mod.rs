pub mod setup;

use crate::events::{Event, EventHandler};
use crate::utils::format_duration;
use log::{debug, error, info, warn};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub use setup::{run_log_path, setup_file_logging};

/// Writes pipeline events to the log as plain lines, for runs whose output
/// is kept in a log file rather than watched on a terminal.
pub struct FileLoggingHandler {
    last_logged_percent: Mutex<u64>,
    last_log_time: Mutex<Option<Instant>>,
}

impl Default for FileLoggingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLoggingHandler {
    pub fn new() -> Self {
        Self {
            last_logged_percent: Mutex::new(0),
            last_log_time: Mutex::new(None),
        }
    }

    /// Progress lines every 10%, or every 5 minutes when the total is unknown
    /// or progress is slow.
    fn should_log_progress(&self, percent: Option<u64>, now: Instant) -> bool {
        let (Ok(mut last_percent), Ok(mut last_time)) =
            (self.last_logged_percent.lock(), self.last_log_time.lock())
        else {
            return false;
        };

        let time_fallback = last_time
            .is_none_or(|t| now.duration_since(t) >= Duration::from_secs(300));
        let milestone = percent.is_some_and(|p| p >= *last_percent + 10);

        if milestone || time_fallback {
            if let Some(p) = percent {
                *last_percent = p;
            }
            *last_time = Some(now);
            true
        } else {
            false
        }
    }
}

impl EventHandler for FileLoggingHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::PipelineStarted {
                input_file,
                output_file,
                detector,
                width,
                height,
                frame_rate,
                total_frames,
            } => {
                info!("Starting redaction run");
                info!("Input: {} ({}x{} @ {:.3} fps)", input_file.display(), width, height, frame_rate);
                info!("Output: {}", output_file.display());
                info!("Detector: {}", detector);
                if let Some(total) = total_frames {
                    info!("Frames: {}", total);
                }
            }

            Event::StateChanged { from, to } => {
                debug!("Pipeline state {} -> {}", from, to);
            }

            Event::FrameProcessed {
                index,
                regions,
                total_frames,
            } => {
                let done = index + 1;
                let percent = total_frames.filter(|&t| t > 0).map(|t| done * 100 / t);
                if self.should_log_progress(percent, Instant::now()) {
                    match (percent, total_frames) {
                        (Some(p), Some(total)) => {
                            info!("Redaction progress: {}% ({}/{} frames)", p, done, total)
                        }
                        _ => info!("Redaction progress: {} frames", done),
                    }
                }
                debug!("Frame {}: {} region(s)", index, regions);
            }

            Event::EncodingStarted {
                frames,
                frame_rate,
                codec,
            } => {
                info!("Encoding {} frames at {:.3} fps with {}", frames, frame_rate, codec);
            }

            Event::Completed { report } => {
                info!("Redaction completed successfully");
                info!("Frames processed: {}", report.frames_processed);
                info!(
                    "Regions redacted: {} in {} frame(s)",
                    report.regions_redacted, report.frames_with_regions
                );
                if report.discarded_regions > 0 {
                    info!("Discarded candidates: {}", report.discarded_regions);
                }
                info!("Total time: {}", format_duration(report.elapsed.as_secs_f64()));
                info!("Output saved to: {}", report.output_path.display());
            }

            Event::Failed {
                category,
                message,
                exit_code,
                retained_staging,
            } => {
                error!("Run failed ({}, exit {}): {}", category, exit_code, message);
                if let Some(dir) = retained_staging {
                    error!("Staged frames kept in {}", dir.display());
                }
            }

            Event::Warning { message } => {
                warn!("{}", message);
            }
        }
    }
}
