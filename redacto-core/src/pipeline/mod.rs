// ============================================================================
// redacto-core/src/pipeline/mod.rs
// ============================================================================
//
// PIPELINE DRIVER: Orchestrates one redaction run from source to output file
//
// WORKFLOW:
// 1. Initializing: validate the configuration, load the detector, open the
//    frame source and create the run's staging directory
// 2. Streaming: for every frame in index order, detect regions, blur them
//    and stage the result; the cancellation flag is checked before each read
// 3. Finalizing: invoke the encoder exactly once over the complete staged
//    sequence, then remove the staging directory
//
// Any error moves the run to Failed. Staging created before the failure is
// kept or removed according to the StagingPolicy, except after cancellation,
// which always removes it. Failures during initialization never leave a
// staging directory behind.
//
// With batch_size > 1, frames are still read and staged in index order, but
// detection and redaction for the frames of one batch run on the rayon pool.
//
// AI-ASSISTANT-INFO: Redaction pipeline orchestration and lifecycle

pub mod cancellation;
pub mod report;
pub mod state;


// ---- Internal crate imports ----
use crate::config::{BlurParameters, FALLBACK_FRAME_RATE, PipelineConfig};
use crate::detection::{RegionDetector, build_detector};
use crate::encoding::{EncodeRequest, encode};
use crate::error::{CoreError, CoreResult};
use crate::events::{Event, EventDispatcher, EventHandler};
use crate::external::FfmpegSpawner;
use crate::media::{Frame, FrameSource, SourceOpener, StreamMetadata};
use crate::redaction::redact;
use crate::staging::StagingArea;

// ---- External crate imports ----
use log::{debug, error, info, warn};
use rayon::prelude::*;

// ---- Standard library imports ----
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub use cancellation::CancellationFlag;
pub use report::PipelineReport;
pub use state::PipelineState;

use report::RunTotals;

/// Result of detecting and redacting one frame.
#[derive(Debug, Clone, Copy)]
struct FrameOutcome {
    regions: usize,
    discarded: usize,
}

/// One redaction run.
///
/// A pipeline owns its configuration, which is never modified once the run
/// starts. Reusing a pipeline for a second run starts over from
/// `Initializing` with a fresh staging directory.
pub struct Pipeline {
    config: PipelineConfig,
    cancellation: CancellationFlag,
    events: EventDispatcher,
    state: PipelineState,
    retained_staging: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancellation: CancellationFlag::new(),
            events: EventDispatcher::new(),
            state: PipelineState::Initializing,
            retained_staging: None,
        }
    }

    /// Uses `flag` as the run's stop request instead of a private one.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A handle that stops the run before its next frame.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Staging directory kept by the last failed run, if the policy kept one.
    pub fn retained_staging(&self) -> Option<&Path> {
        self.retained_staging.as_deref()
    }

    /// Runs the pipeline with the detector named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error of the run; see [`CoreError::exit_code`] for
    /// how each class maps to a process exit status.
    pub fn run<O, S>(&mut self, opener: &O, spawner: &S) -> CoreResult<PipelineReport>
    where
        O: SourceOpener,
        S: FfmpegSpawner,
    {
        let started = Instant::now();
        self.reset();
        let result = self.config.validate().and_then(|()| {
            let detector = build_detector(&self.config.detector)?;
            info!("Using {} detector", detector.name());
            self.execute(detector.as_ref(), opener, spawner, started)
        });
        self.conclude(result)
    }

    /// Runs the pipeline with an already constructed detector.
    pub fn run_with_detector<O, S>(
        &mut self,
        detector: &dyn RegionDetector,
        opener: &O,
        spawner: &S,
    ) -> CoreResult<PipelineReport>
    where
        O: SourceOpener,
        S: FfmpegSpawner,
    {
        let started = Instant::now();
        self.reset();
        let result = self
            .config
            .validate()
            .and_then(|()| self.execute(detector, opener, spawner, started));
        self.conclude(result)
    }

    fn reset(&mut self) {
        self.state = PipelineState::Initializing;
        self.retained_staging = None;
    }

    fn execute<O, S>(
        &mut self,
        detector: &dyn RegionDetector,
        opener: &O,
        spawner: &S,
        started: Instant,
    ) -> CoreResult<PipelineReport>
    where
        O: SourceOpener,
        S: FfmpegSpawner,
    {
        // ---- Initializing ----
        let mut source = opener.open(&self.config.input_path)?;
        let metadata = *source.metadata();
        let frame_rate = self.resolve_frame_rate(&metadata);
        let mut staging = StagingArea::create(&self.config.staging_dir, self.config.staging_policy)?;

        self.events.emit(Event::PipelineStarted {
            input_file: self.config.input_path.clone(),
            output_file: self.config.output_path.clone(),
            detector: detector.name().to_string(),
            width: metadata.width,
            height: metadata.height,
            frame_rate,
            total_frames: metadata.total_frames,
        });

        // ---- Streaming ----
        self.transition(PipelineState::Streaming);
        let totals = match self.stream(detector, &mut source, &mut staging, metadata.total_frames) {
            Ok(totals) => totals,
            // Cancellation removes staged frames regardless of policy.
            Err(e @ CoreError::Cancelled { .. }) => {
                staging.discard();
                return Err(e);
            }
            Err(e) => {
                self.retained_staging = staging.finish_failure();
                return Err(e);
            }
        };
        drop(source);

        if totals.frames == 0 {
            staging.discard();
            return Err(CoreError::EmptyInput(format!(
                "no frames could be read from {}",
                self.config.input_path.display()
            )));
        }
        if !staging.is_contiguous() || staging.staged_count() != totals.frames {
            let staged = staging.staged_count();
            self.retained_staging = staging.finish_failure();
            return Err(CoreError::Staging(format!(
                "staged frames are not contiguous: {} staged for {} read",
                staged, totals.frames
            )));
        }
        if totals.discarded > 0 {
            warn!(
                "{} detection(s) lay outside the frame and were discarded",
                totals.discarded
            );
        }

        // ---- Finalizing ----
        self.transition(PipelineState::Finalizing);
        let request = EncodeRequest {
            input_dir: staging.path().to_path_buf(),
            pattern: staging.pattern().to_string(),
            output_path: self.config.output_path.clone(),
            frame_rate,
            threads: self.config.encoder_threads,
            profile: self.config.encoder.clone(),
        };
        self.events.emit(Event::EncodingStarted {
            frames: totals.frames,
            frame_rate,
            codec: self.config.encoder.codec().to_string(),
        });

        if let Err(e) = encode(spawner, &request) {
            self.retained_staging = staging.finish_failure();
            return Err(e);
        }
        if let Err(e) = staging.finish_success() {
            // The output is already in place; a leftover staging directory
            // does not fail the run.
            warn!("{}", e);
            self.events.emit(Event::Warning {
                message: e.to_string(),
            });
        }

        Ok(PipelineReport {
            frames_processed: totals.frames,
            regions_redacted: totals.regions,
            frames_with_regions: totals.frames_with_regions,
            discarded_regions: totals.discarded,
            frame_rate,
            output_path: self.config.output_path.clone(),
            elapsed: started.elapsed(),
        })
    }

    /// Reads, redacts and stages every frame of `source` in index order.
    fn stream<F: FrameSource>(
        &self,
        detector: &dyn RegionDetector,
        source: &mut F,
        staging: &mut StagingArea,
        total_frames: Option<u64>,
    ) -> CoreResult<RunTotals> {
        let batch_size = self.config.batch_size.max(1);
        let mut totals = RunTotals::default();
        let mut batch: Vec<Frame> = Vec::with_capacity(batch_size);

        loop {
            let mut end_of_stream = false;
            while batch.len() < batch_size {
                if self.cancellation.is_cancelled() {
                    info!("Cancellation requested after {} frame(s)", staging.staged_count());
                    return Err(CoreError::Cancelled {
                        frames_staged: staging.staged_count(),
                    });
                }
                match source.next_frame()? {
                    Some(frame) => {
                        let expected = totals.frames + batch.len() as u64;
                        if frame.index != expected {
                            return Err(CoreError::FrameDecode {
                                index: frame.index,
                                reason: format!("expected frame {expected}, source produced {}", frame.index),
                            });
                        }
                        batch.push(frame);
                    }
                    None => {
                        end_of_stream = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                break;
            }

            let outcomes = process_frames(detector, &self.config.blur, &mut batch)?;
            for (frame, outcome) in batch.drain(..).zip(outcomes) {
                staging.stage(&frame)?;
                totals.record(outcome.regions, outcome.discarded);
                debug!(
                    "Frame {} staged with {} region(s) redacted",
                    frame.index, outcome.regions
                );
                self.events.emit(Event::FrameProcessed {
                    index: frame.index,
                    regions: outcome.regions,
                    total_frames,
                });
            }

            if end_of_stream {
                break;
            }
        }

        info!(
            "Processed {} frame(s), {} region(s) redacted",
            totals.frames, totals.regions
        );
        Ok(totals)
    }

    fn resolve_frame_rate(&self, metadata: &StreamMetadata) -> f64 {
        if let Some(rate) = self.config.frame_rate_override {
            debug!("Using frame rate override {}", rate);
            return rate;
        }
        match metadata.frame_rate {
            Some(rate) => rate,
            None => {
                let message = format!(
                    "source does not report a frame rate, assuming {FALLBACK_FRAME_RATE} fps"
                );
                warn!("{}", message);
                self.events.emit(Event::Warning { message });
                FALLBACK_FRAME_RATE
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(&next) {
            warn!("Unexpected pipeline transition {} -> {}", self.state, next);
        }
        info!("Pipeline state: {} -> {}", self.state.name(), next.name());
        self.events.emit(Event::StateChanged {
            from: self.state.name().to_string(),
            to: next.name().to_string(),
        });
        self.state = next;
    }

    fn conclude(&mut self, result: CoreResult<PipelineReport>) -> CoreResult<PipelineReport> {
        match result {
            Ok(report) => {
                self.transition(PipelineState::Done);
                info!(
                    "Redaction complete: {} frame(s), {} region(s) -> {}",
                    report.frames_processed,
                    report.regions_redacted,
                    report.output_path.display()
                );
                self.events.emit(Event::Completed {
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                error!("Pipeline failed during {}: {}", self.state.name(), e);
                self.transition(PipelineState::Failed(e.to_string()));
                self.events.emit(Event::Failed {
                    category: e.category().to_string(),
                    message: e.to_string(),
                    exit_code: e.exit_code(),
                    retained_staging: self.retained_staging.clone(),
                });
                Err(e)
            }
        }
    }
}

/// Detects and redacts each frame of a batch in place.
///
/// Batches of more than one frame are processed on the rayon pool. On error
/// the failure of the lowest frame index is returned.
fn process_frames(
    detector: &dyn RegionDetector,
    blur: &BlurParameters,
    frames: &mut [Frame],
) -> CoreResult<Vec<FrameOutcome>> {
    if frames.len() <= 1 {
        return frames
            .iter_mut()
            .map(|frame| process_frame(detector, blur, frame))
            .collect();
    }

    let results: Vec<CoreResult<FrameOutcome>> = frames
        .par_iter_mut()
        .map(|frame| process_frame(detector, blur, frame))
        .collect();
    results.into_iter().collect()
}

fn process_frame(
    detector: &dyn RegionDetector,
    blur: &BlurParameters,
    frame: &mut Frame,
) -> CoreResult<FrameOutcome> {
    let detections = detector.detect(frame)?;
    let regions = redact(frame, &detections, blur)?;
    Ok(FrameOutcome {
        regions,
        discarded: detections.discarded,
    })
}
