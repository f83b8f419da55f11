// ============================================================================
// redacto-core/src/encoding/mod.rs
// ============================================================================
//
// ENCODER INVOCATION: Reassembling staged frames into the output video
//
// Builds the ffmpeg command as an explicit argument list (no shell), reading
// the staged PNG sequence at the run's frame rate and encoding it with the
// configured profile. ffmpeg writes to a hidden temporary file beside the
// output; the file is renamed into place only after a successful exit, so a
// failed encode never truncates or replaces an existing output.
//
// AI-ASSISTANT-INFO: ffmpeg encode of the staged frame sequence

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;

use crate::config::EncoderProfile;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, run_collecting_diagnostics};
use crate::temp_files;

/// Prefix of the temporary file ffmpeg writes before it is renamed into place.
const TEMP_OUTPUT_PREFIX: &str = ".redacto_";

/// Everything the encoder needs to produce the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// Directory holding the staged frames
    pub input_dir: PathBuf,
    /// Image-sequence pattern inside `input_dir`, e.g. `frame_%05d.png`
    pub pattern: String,
    pub output_path: PathBuf,
    pub frame_rate: f64,
    pub threads: usize,
    pub profile: EncoderProfile,
}

/// Builds the ffmpeg command for `request`, writing to `output`.
pub fn build_encode_command(request: &EncodeRequest, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.arg("-hide_banner");
    cmd.arg("-y");
    cmd.args(["-framerate", &request.frame_rate.to_string()]);
    cmd.input(request.input_dir.join(&request.pattern).to_string_lossy().as_ref());

    match &request.profile {
        EncoderProfile::X265 { crf, preset, bitrate } => {
            cmd.args(["-c:v", "libx265"]);
            cmd.args(["-crf", &crf.to_string()]);
            cmd.args(["-preset", preset]);
            cmd.args(["-b:v", bitrate]);
        }
        EncoderProfile::Nvenc { cq, preset, tune } => {
            cmd.args(["-c:v", "hevc_nvenc"]);
            cmd.args(["-tune", tune]);
            cmd.args(["-cq", &cq.to_string()]);
            cmd.args(["-preset", preset]);
        }
    }
    cmd.args(["-pix_fmt", "yuv420p"]);
    cmd.args(["-threads", &request.threads.to_string()]);
    cmd.output(output.to_string_lossy().as_ref());
    cmd
}

/// Runs the encoder once over the staged frames.
///
/// # Errors
///
/// * `CoreError::Encode` - ffmpeg could not be started or exited unsuccessfully;
///   the error carries ffmpeg's warning and error output verbatim
/// * `CoreError::Io` - the finished file could not be moved into place
pub fn encode<S: FfmpegSpawner>(spawner: &S, request: &EncodeRequest) -> CoreResult<()> {
    let temp_output = temp_files::create_sibling_temp_path(&request.output_path, TEMP_OUTPUT_PREFIX)?;

    let cmd = build_encode_command(request, &temp_output);
    log::info!(
        "Encoding {} at {} fps with {}",
        request.output_path.display(),
        request.frame_rate,
        request.profile.codec()
    );
    log::debug!("Running encode command: {:?}", cmd);

    let mut process = spawner.spawn(cmd).map_err(|e| CoreError::Encode {
        status: "not started".to_string(),
        diagnostics: e.to_string(),
    })?;
    let outcome = run_collecting_diagnostics(&mut process)?;

    if !outcome.status.success() {
        log::error!("Encoder failed: {}", outcome.status);
        return Err(CoreError::Encode {
            status: outcome.status.to_string(),
            diagnostics: outcome.diagnostics.join("\n"),
        });
    }

    temp_output
        .persist(&request.output_path)
        .map_err(|e| CoreError::Io(e.error))?;
    log::info!("Encoded output written to {}", request.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::MockFfmpegSpawner;
    use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};

    fn request(dir: &Path, profile: EncoderProfile) -> EncodeRequest {
        EncodeRequest {
            input_dir: dir.join("frames"),
            pattern: "frame_%05d.png".to_string(),
            output_path: dir.join("out.mp4"),
            frame_rate: 24.0,
            threads: 8,
            profile,
        }
    }

    fn args_of(cmd: &mut FfmpegCommand) -> Vec<String> {
        cmd.as_inner()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_x265_command_arguments() {
        let dir = Path::new("/work");
        let mut cmd = build_encode_command(&request(dir, EncoderProfile::x265()), Path::new("/work/tmp.mp4"));
        let joined = args_of(&mut cmd).join(" ");
        assert!(joined.contains("-framerate 24 -i /work/frames/frame_%05d.png"));
        assert!(joined.contains("-c:v libx265 -crf 12 -preset slow -b:v 10M"));
        assert!(joined.contains("-pix_fmt yuv420p -threads 8"));
        assert!(joined.ends_with("/work/tmp.mp4"));
    }

    #[test]
    fn test_nvenc_command_arguments() {
        let dir = Path::new("/work");
        let mut cmd = build_encode_command(&request(dir, EncoderProfile::nvenc()), Path::new("/work/tmp.mp4"));
        let joined = args_of(&mut cmd).join(" ");
        assert!(joined.contains("-c:v hevc_nvenc -tune hq -cq 16 -preset slow"));
        assert!(!joined.contains("libx265"));
    }

    #[test]
    fn test_fractional_frame_rate_is_passed_through() {
        let mut req = request(Path::new("/work"), EncoderProfile::x265());
        req.frame_rate = 30000.0 / 1001.0;
        let mut cmd = build_encode_command(&req, Path::new("/work/tmp.mp4"));
        let args = args_of(&mut cmd);
        let pos = args.iter().position(|a| a == "-framerate").unwrap();
        let rate: f64 = args[pos + 1].parse().unwrap();
        assert!((rate - 29.97).abs() < 0.001);
    }

    #[test]
    fn test_success_moves_output_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("libx265", vec![FfmpegEvent::Done]);

        let req = request(dir.path(), EncoderProfile::x265());
        encode(&spawner, &req).unwrap();

        assert_eq!(std::fs::read(&req.output_path).unwrap(), b"encoded");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_OUTPUT_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(spawner.get_received_calls().len(), 1);
    }

    #[test]
    fn test_failure_reports_diagnostics_and_keeps_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), EncoderProfile::x265());
        std::fs::write(&req.output_path, b"previous run").unwrap();

        let spawner = MockFfmpegSpawner::new();
        spawner.add_exit_error_expectation(
            "libx265",
            vec![
                FfmpegEvent::Log(LogLevel::Info, "Input #0".to_string()),
                FfmpegEvent::Log(LogLevel::Error, "Unknown encoder 'libx265'".to_string()),
            ],
            1,
        );

        match encode(&spawner, &req) {
            Err(CoreError::Encode { diagnostics, .. }) => {
                assert_eq!(diagnostics, "Unknown encoder 'libx265'");
            }
            other => panic!("expected encode error, got {other:?}"),
        }
        assert_eq!(std::fs::read(&req.output_path).unwrap(), b"previous run");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_spawn_failure_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_spawn_error_expectation(
            "libx265",
            CoreError::DependencyNotFound("ffmpeg".to_string()),
        );

        let err = encode(&spawner, &request(dir.path(), EncoderProfile::x265())).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(!dir.path().join("out.mp4").exists());
    }
}
