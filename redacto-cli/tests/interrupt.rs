// redacto-cli/tests/interrupt.rs
//
// A real SIGINT delivered mid-run: the redact command must stop, report
// Cancelled with exit status 130 and leave neither staged frames nor an
// output file behind. Kept in its own test binary because the process-wide
// signal handler is installed once.

#![cfg(feature = "opencv")]

use clap::Parser;
use image::{Rgb, RgbImage};
use nix::sys::signal::{Signal, raise};
use redacto_cli::{Cli, Commands, RedactArgs, run_redact_with};
use redacto_core::external::mocks::MockFfmpegSpawner;
use redacto_core::{CoreError, CoreResult, Frame, FrameSource, SourceOpener, StreamMetadata};
use std::path::Path;
use std::time::Duration;

const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount>
  </stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount>
  </featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 1.0000000149011612e-01</internalNodes>
          <leafValues>-1. 1.</leafValues>
        </_>
      </weakClassifiers>
    </_>
  </stages>
  <features>
    <_>
      <rects>
        <_>0 0 2 4 -1.</_>
        <_>2 0 2 4 1.</_>
      </rects>
    </_>
  </features>
</cascade>
</opencv_storage>
"#;

const TOTAL_FRAMES: u64 = 500;
const INTERRUPT_AFTER: u64 = 3;

/// Slow synthetic source that sends SIGINT to this process once
/// `INTERRUPT_AFTER` frames have been handed out.
struct InterruptingSource {
    metadata: StreamMetadata,
    next: u64,
}

impl FrameSource for InterruptingSource {
    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> CoreResult<Option<Frame>> {
        if self.next == TOTAL_FRAMES {
            return Ok(None);
        }
        if self.next == INTERRUPT_AFTER {
            raise(Signal::SIGINT).expect("raise SIGINT");
        }
        std::thread::sleep(Duration::from_millis(10));
        let frame = Frame::new(self.next, RgbImage::from_pixel(16, 16, Rgb([90, 90, 90])));
        self.next += 1;
        Ok(Some(frame))
    }
}

struct InterruptingOpener;

impl SourceOpener for InterruptingOpener {
    type Source = InterruptingSource;

    fn open(&self, _path: &Path) -> CoreResult<InterruptingSource> {
        Ok(InterruptingSource {
            metadata: StreamMetadata {
                frame_rate: Some(25.0),
                width: 16,
                height: 16,
                total_frames: Some(TOTAL_FRAMES),
            },
            next: 0,
        })
    }
}

fn redact_args(dir: &Path) -> RedactArgs {
    let classifier = dir.join("edge.xml");
    std::fs::write(&classifier, EDGE_CASCADE).unwrap();
    let argv = vec![
        "redacto".to_string(),
        "redact".to_string(),
        "--input".to_string(),
        dir.join("in.mp4").display().to_string(),
        "--output".to_string(),
        dir.join("out.mp4").display().to_string(),
        "--detector".to_string(),
        "cascade".to_string(),
        "--classifier".to_string(),
        classifier.display().to_string(),
        "--staging-dir".to_string(),
        dir.join("staging").display().to_string(),
        "--threads".to_string(),
        "1".to_string(),
        "--json-progress".to_string(),
    ];
    match Cli::parse_from(argv).command {
        Commands::Redact(args) => args,
        Commands::Check => panic!("expected redact"),
    }
}

#[test]
fn test_sigint_cancels_run_with_exit_130_and_no_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir(&staging).unwrap();
    let spawner = MockFfmpegSpawner::new();

    let err = run_redact_with(redact_args(dir.path()), false, &InterruptingOpener, &spawner).unwrap_err();

    match &err {
        CoreError::Cancelled { frames_staged } => {
            assert!(*frames_staged >= INTERRUPT_AFTER);
            assert!(*frames_staged < TOTAL_FRAMES);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 130);
    assert!(spawner.get_received_calls().is_empty());
    assert!(std::fs::read_dir(&staging).unwrap().next().is_none());
    assert!(!dir.path().join("out.mp4").exists());
}
