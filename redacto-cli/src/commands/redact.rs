//! Implementation of the 'redact' subcommand.
//!
//! Translates the arguments into a validated `PipelineConfig`, attaches the
//! progress handlers the invocation asked for and runs the pipeline against
//! the real ffmpeg decoder and encoder. Ctrl-C during the run cancels it.

use crate::cli::{DetectorKind, EncoderKind, RedactArgs};
use crate::error::CliResult;
use crate::interrupt::cancel_on_interrupt;
use crate::progress::ProgressBarHandler;

use redacto_core::config::{
    CascadeParams, DetectorConfig, EncoderProfile, NeuralParams, PipelineConfig,
    PipelineConfigBuilder, StagingPolicy,
};
use redacto_core::external::{FfmpegSpawner, SidecarSpawner};
use redacto_core::file_logging::FileLoggingHandler;
use redacto_core::media::FfmpegSourceOpener;
use redacto_core::{
    JsonProgressHandler, Pipeline, PipelineReport, SourceOpener, format_bytes, format_duration,
};

use console::style;
use log::{debug, info};
use std::sync::Arc;

/// Builds the run configuration from command-line arguments.
pub fn build_config(args: &RedactArgs) -> CliResult<PipelineConfig> {
    let detector = match args.detector {
        DetectorKind::Cascade => DetectorConfig::Cascade(CascadeParams::new(&args.classifier)),
        DetectorKind::Neural => DetectorConfig::Neural(NeuralParams {
            confidence: args.confidence,
            ..NeuralParams::new(&args.model)
        }),
    };
    let encoder = match args.encoder {
        EncoderKind::X265 => EncoderProfile::x265(),
        EncoderKind::Nvenc => EncoderProfile::nvenc(),
    };

    PipelineConfigBuilder::new(&args.input_path, &args.output_path)
        .detector(detector)
        .blur_kernel(args.strength)
        .blur_sigma(args.sigma)
        .frame_rate(args.framerate)
        .encoder(encoder)
        .encoder_threads(args.threads)
        .staging_dir(args.staging_dir.clone())
        .staging_policy(StagingPolicy {
            retain_on_failure: !args.clean_on_failure,
        })
        .batch_size(args.batch_size)
        .build()
}

/// Runs one redaction. `file_logging` attaches the plain-text log handler.
pub fn run_redact(args: RedactArgs, file_logging: bool) -> CliResult<PipelineReport> {
    run_redact_with(args, file_logging, &FfmpegSourceOpener, &SidecarSpawner)
}

/// [`run_redact`] with the frame source and encoder process supplied by the caller.
pub fn run_redact_with<O, S>(
    args: RedactArgs,
    file_logging: bool,
    opener: &O,
    spawner: &S,
) -> CliResult<PipelineReport>
where
    O: SourceOpener,
    S: FfmpegSpawner,
{
    let config = build_config(&args)?;
    debug!(
        "Effective configuration: {}",
        serde_json::to_string(&config).unwrap_or_else(|e| e.to_string())
    );
    info!(
        "Redacting {} -> {}",
        config.input_path.display(),
        config.output_path.display()
    );

    let mut pipeline = Pipeline::new(config);
    if args.json_progress {
        pipeline.add_event_handler(Arc::new(JsonProgressHandler::new()));
    } else if console::user_attended_stderr() {
        pipeline.add_event_handler(Arc::new(ProgressBarHandler::new()));
    }
    if file_logging {
        pipeline.add_event_handler(Arc::new(FileLoggingHandler::new()));
    }

    let result = {
        let _interrupt = cancel_on_interrupt(pipeline.cancellation_flag());
        pipeline.run(opener, spawner)
    };
    if result.is_err() {
        if let Some(dir) = pipeline.retained_staging() {
            eprintln!(
                "{} staged frames kept in {}",
                style("Note:").cyan(),
                dir.display()
            );
        }
    }
    let report = result?;

    if !args.json_progress {
        print_summary(&report);
    }
    Ok(report)
}

fn print_summary(report: &PipelineReport) {
    let output_size = std::fs::metadata(&report.output_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());

    println!("{}", style("Redaction complete").green().bold());
    println!("  Output:          {} ({})", report.output_path.display(), output_size);
    println!("  Frames:          {}", report.frames_processed);
    println!(
        "  Regions blurred: {} in {} frame(s)",
        report.regions_redacted, report.frames_with_regions
    );
    println!("  Frame rate:      {:.3} fps", report.frame_rate);
    println!(
        "  Time:            {} ({:.1} frames/s)",
        format_duration(report.elapsed.as_secs_f64()),
        report.throughput()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use redacto_core::CoreError;

    fn redact_args(extra: &[&str]) -> RedactArgs {
        let mut argv = vec!["redacto", "redact", "-i", "input.mp4", "-o", "output.mp4"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Redact(args) => args,
            Commands::Check => panic!("expected redact"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = redact_args(&["--threads", "4", "--batch-size", "1", "--staging-dir", "."]);
        let config = build_config(&args).unwrap();
        match &config.detector {
            DetectorConfig::Neural(params) => {
                assert_eq!(params.model_path.to_str(), Some("yolov8n-face.onnx"));
                assert_eq!(params.confidence, 0.5);
            }
            other => panic!("expected neural detector, got {other:?}"),
        }
        assert_eq!(config.blur.kernel_size, 51);
        assert_eq!(config.blur.sigma, 40.0);
        assert_eq!(config.encoder, EncoderProfile::x265());
        assert!(config.staging_policy.retain_on_failure);
        assert_eq!(config.encoder_threads, 4);
    }

    #[test]
    fn test_cascade_with_even_strength() {
        let args = redact_args(&[
            "--detector",
            "cascade",
            "--classifier",
            "faces.xml",
            "--strength",
            "40",
            "--threads",
            "2",
        ]);
        let config = build_config(&args).unwrap();
        assert!(matches!(config.detector, DetectorConfig::Cascade(_)));
        assert_eq!(config.blur.kernel_size, 41);
        assert_eq!(config.blur.sigma, 30.0);
    }

    #[test]
    fn test_flags_reach_the_config() {
        let args = redact_args(&[
            "--conf",
            "0.7",
            "--sigma",
            "12.5",
            "--framerate",
            "29.97",
            "--encoder",
            "nvenc",
            "--clean-on-failure",
            "--batch-size",
            "8",
            "--threads",
            "2",
        ]);
        let config = build_config(&args).unwrap();
        match &config.detector {
            DetectorConfig::Neural(params) => assert_eq!(params.confidence, 0.7),
            other => panic!("expected neural detector, got {other:?}"),
        }
        assert_eq!(config.blur.sigma, 12.5);
        assert_eq!(config.frame_rate_override, Some(29.97));
        assert_eq!(config.encoder, EncoderProfile::nvenc());
        assert!(!config.staging_policy.retain_on_failure);
        assert_eq!(config.batch_size, 8);
    }

    #[test]
    fn test_invalid_confidence_is_configuration_error() {
        let args = redact_args(&["--conf", "1.5", "--threads", "1"]);
        let err = build_config(&args).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
