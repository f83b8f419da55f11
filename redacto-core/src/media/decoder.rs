// ============================================================================
// redacto-core/src/media/decoder.rs
// ============================================================================
//
// FRAME DECODING: Raw RGB frames from ffmpeg-sidecar
//
// The decoder runs ffmpeg with raw rgb24 output on stdout and turns its
// event stream into a pull-based FrameSource. Frames are numbered by the
// decoder itself so indices are contiguous from 0 regardless of what ffmpeg
// reports. Fatal log lines, error events, a malformed frame buffer or a
// non-zero exit at end of stream are all FrameDecode errors.
//
// The child process is killed and reaped on drop if it is still running,
// so every pipeline exit path releases it.
//
// AI-ASSISTANT-INFO: ffmpeg-backed FrameSource implementation

use std::path::Path;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use image::RgbImage;

use super::{Frame, FrameSource, SourceOpener, StreamMetadata, probe_stream};
use crate::error::{CoreError, CoreResult, command_start_error};

/// Opens inputs by probing with ffprobe and decoding with ffmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegSourceOpener;

impl SourceOpener for FfmpegSourceOpener {
    type Source = FfmpegFrameSource;

    fn open(&self, path: &Path) -> CoreResult<Self::Source> {
        if !path.is_file() {
            return Err(CoreError::SourceOpen {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }

        let metadata = probe_stream(path)?;
        log::debug!(
            "Probed {}: {}x{}, frame rate {:?}, frames {:?}",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.frame_rate,
            metadata.total_frames
        );

        let mut cmd = build_decode_command(path);
        log::debug!("Running decode command: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (decode)", e))?;
        let events = child.iter().map_err(|e| CoreError::SourceOpen {
            path: path.display().to_string(),
            reason: format!("could not read decoder output: {e}"),
        })?;

        Ok(FfmpegFrameSource::new(metadata, Box::new(events), Some(child)))
    }
}

/// Builds the decode command: first video stream, every frame, rgb24 on stdout.
pub(crate) fn build_decode_command(path: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.arg("-hide_banner");
    cmd.input(path.to_string_lossy().as_ref());
    cmd.args(["-map", "0:v:0"]);
    // ffmpeg 5.1+, see MIN_FFMPEG_VERSION
    cmd.args(["-fps_mode", "passthrough"]);
    cmd.rawvideo();
    cmd
}

/// [`FrameSource`] backed by a running ffmpeg decoder.
pub struct FfmpegFrameSource {
    metadata: StreamMetadata,
    events: Box<dyn Iterator<Item = FfmpegEvent>>,
    child: Option<FfmpegChild>,
    next_index: u64,
    finished: bool,
    error_lines: Vec<String>,
}

impl FfmpegFrameSource {
    pub(crate) fn new(
        metadata: StreamMetadata,
        events: Box<dyn Iterator<Item = FfmpegEvent>>,
        child: Option<FfmpegChild>,
    ) -> Self {
        Self {
            metadata,
            events,
            child,
            next_index: 0,
            finished: false,
            error_lines: Vec::new(),
        }
    }

    fn decode_error(&self, reason: impl Into<String>) -> CoreError {
        CoreError::FrameDecode {
            index: self.next_index,
            reason: reason.into(),
        }
    }

    /// Collects the decoder's exit status once the event stream ends.
    fn finish(&mut self) -> CoreResult<()> {
        self.finished = true;
        if !self.error_lines.is_empty() {
            log::warn!(
                "Decoder reported {} error line(s): {}",
                self.error_lines.len(),
                self.error_lines.join(" | ")
            );
        }

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| self.decode_error(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(self.decode_error(format!(
                "decoder exited with {status}: {}",
                self.error_lines.join("\n")
            )))
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> CoreResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        while let Some(event) = self.events.next() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let expected = frame.width as usize * frame.height as usize * 3;
                    if frame.data.len() != expected {
                        return Err(self.decode_error(format!(
                            "frame buffer has {} bytes, expected {} for {}x{} rgb24",
                            frame.data.len(),
                            expected,
                            frame.width,
                            frame.height
                        )));
                    }
                    let image = RgbImage::from_raw(frame.width, frame.height, frame.data)
                        .ok_or_else(|| self.decode_error("frame buffer could not be wrapped"))?;

                    let index = self.next_index;
                    self.next_index += 1;
                    return Ok(Some(Frame::new(index, image)));
                }
                FfmpegEvent::Log(LogLevel::Fatal, line) | FfmpegEvent::Error(line) => {
                    self.finished = true;
                    return Err(self.decode_error(line));
                }
                FfmpegEvent::Log(LogLevel::Error, line) => {
                    self.error_lines.push(line);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }

        self.finish()?;
        Ok(None)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("Decoder already exited: {}", e);
            }
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_sidecar::event::OutputVideoFrame;

    fn metadata() -> StreamMetadata {
        StreamMetadata {
            frame_rate: Some(24.0),
            width: 2,
            height: 2,
            total_frames: None,
        }
    }

    fn output_frame(frame_num: u32, data: Vec<u8>) -> FfmpegEvent {
        FfmpegEvent::OutputFrame(OutputVideoFrame {
            width: 2,
            height: 2,
            pix_fmt: "rgb24".to_string(),
            output_index: 0,
            data,
            frame_num,
            timestamp: frame_num as f32 / 24.0,
        })
    }

    fn source(events: Vec<FfmpegEvent>) -> FfmpegFrameSource {
        FfmpegFrameSource::new(metadata(), Box::new(events.into_iter()), None)
    }

    #[test]
    fn test_frames_are_indexed_contiguously() {
        let mut src = source(vec![
            FfmpegEvent::Log(LogLevel::Info, "Input #0".to_string()),
            output_frame(0, vec![1; 12]),
            output_frame(5, vec![2; 12]),
            FfmpegEvent::Done,
        ]);

        let first = src.next_frame().unwrap().unwrap();
        let second = src.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(second.image.get_pixel(1, 1).0, [2, 2, 2]);
        assert!(src.next_frame().unwrap().is_none());
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_short_buffer_is_decode_error() {
        let mut src = source(vec![output_frame(0, vec![0; 5])]);
        let err = src.next_frame().unwrap_err();
        assert!(matches!(err, CoreError::FrameDecode { index: 0, .. }));
    }

    #[test]
    fn test_fatal_log_is_decode_error() {
        let mut src = source(vec![
            output_frame(0, vec![0; 12]),
            FfmpegEvent::Log(LogLevel::Fatal, "corrupt packet".to_string()),
        ]);
        assert!(src.next_frame().unwrap().is_some());
        match src.next_frame() {
            Err(CoreError::FrameDecode { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("corrupt packet"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_fatal_error_lines_do_not_stop_decoding() {
        let mut src = source(vec![
            FfmpegEvent::Log(LogLevel::Error, "concealing errors".to_string()),
            output_frame(0, vec![0; 12]),
            FfmpegEvent::Done,
        ]);
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_decode_command_arguments() {
        let mut cmd = build_decode_command(Path::new("/videos/in.mp4"));
        let args: Vec<String> = cmd
            .as_inner()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let joined = args.join(" ");
        assert!(joined.contains("-i /videos/in.mp4"));
        assert!(joined.contains("-map 0:v:0"));
        assert!(joined.contains("rgb24"));
    }
}
