// ============================================================================
// redacto-core/src/media/probe.rs
// ============================================================================
//
// STREAM PROBING: Video stream metadata via the ffprobe crate
//
// Reads the first video stream of an input and reduces it to the metadata
// the pipeline needs: frame rate, dimensions and (when present) the frame
// count. Every probe failure is reported as a SourceOpen error, since a file
// ffprobe cannot read is a file the pipeline cannot open.
//
// AI-ASSISTANT-INFO: ffprobe-based stream metadata for the frame source

use std::path::Path;

use ffprobe::{FfProbeError, Stream, ffprobe};

use super::StreamMetadata;
use crate::error::{CoreError, CoreResult};
use crate::utils::parse_frame_rate;

/// Probes `input_path` and returns the metadata of its first video stream.
pub fn probe_stream(input_path: &Path) -> CoreResult<StreamMetadata> {
    log::debug!(
        "Running ffprobe (via crate) for stream metadata on: {}",
        input_path.display()
    );

    let probe = ffprobe(input_path).map_err(|err| {
        log::error!("ffprobe failed on {}: {:?}", input_path.display(), err);
        map_ffprobe_error(input_path, err)
    })?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| source_error(input_path, "no video stream found"))?;

    metadata_from_stream(input_path, video_stream)
}

fn metadata_from_stream(input_path: &Path, stream: &Stream) -> CoreResult<StreamMetadata> {
    let width = stream
        .width
        .ok_or_else(|| source_error(input_path, "video stream is missing its width"))?;
    let height = stream
        .height
        .ok_or_else(|| source_error(input_path, "video stream is missing its height"))?;

    if width <= 0 || height <= 0 {
        return Err(source_error(
            input_path,
            format!("invalid dimensions {width}x{height}"),
        ));
    }

    // r_frame_rate is the container's base rate; avg_frame_rate covers
    // streams where it is reported as 0/0.
    let frame_rate =
        parse_frame_rate(&stream.r_frame_rate).or_else(|| parse_frame_rate(&stream.avg_frame_rate));

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok());

    Ok(StreamMetadata {
        frame_rate,
        width: width as u32,
        height: height as u32,
        total_frames,
    })
}

fn map_ffprobe_error(input_path: &Path, err: FfProbeError) -> CoreError {
    let reason = match err {
        FfProbeError::Io(io_err) => format!("could not run ffprobe: {io_err}"),
        FfProbeError::Status(output) => format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        FfProbeError::Deserialize(err) => format!("unreadable ffprobe output: {err}"),
        other => format!("unknown ffprobe error: {other:?}"),
    };
    source_error(input_path, reason)
}

fn source_error(input_path: &Path, reason: impl Into<String>) -> CoreError {
    CoreError::SourceOpen {
        path: input_path.display().to_string(),
        reason: reason.into(),
    }
}
