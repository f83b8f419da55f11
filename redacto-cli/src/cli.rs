// redacto-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use redacto_core::config::{DEFAULT_CLASSIFIER_PATH, DEFAULT_CONFIDENCE, DEFAULT_MODEL_PATH};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Redacto: blur faces in video",
    long_about = "Detects faces in every frame of a video with a Haar cascade or an ONNX \
                  face model, blurs them irreversibly and re-encodes the result with ffmpeg."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Redacts faces in a video file
    Redact(RedactArgs),
    /// Checks that ffmpeg and ffprobe are available
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorKind {
    /// Haar cascade classifier (OpenCV XML)
    Cascade,
    /// YOLO-style ONNX face model
    Neural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncoderKind {
    /// libx265 software encoder
    X265,
    /// NVIDIA hevc_nvenc hardware encoder
    Nvenc,
}

#[derive(Parser, Debug)]
pub struct RedactArgs {
    /// Video file to redact
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_FILE")]
    pub input_path: PathBuf,

    /// Path of the redacted output video
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_FILE")]
    pub output_path: PathBuf,

    // --- Detection ---
    /// Face detector to use
    #[arg(long, value_enum, default_value_t = DetectorKind::Neural)]
    pub detector: DetectorKind,

    /// Haar cascade XML for the cascade detector
    #[arg(long, value_name = "XML", default_value = DEFAULT_CLASSIFIER_PATH)]
    pub classifier: PathBuf,

    /// ONNX model for the neural detector
    #[arg(long, value_name = "ONNX", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Minimum detection confidence for the neural detector, in (0, 1]
    #[arg(long = "conf", value_name = "SCORE", default_value_t = DEFAULT_CONFIDENCE)]
    pub confidence: f32,

    // --- Blur ---
    /// Blur kernel size in pixels; even values are rounded up to the next odd
    /// size (default: 41 cascade, 51 neural)
    #[arg(long, value_name = "PIXELS")]
    pub strength: Option<u32>,

    /// Gaussian sigma (default: 30 cascade, 40 neural)
    #[arg(long, value_name = "SIGMA")]
    pub sigma: Option<f32>,

    // --- Output ---
    /// Output frame rate; defaults to the input's rate
    #[arg(long, value_name = "FPS")]
    pub framerate: Option<f64>,

    /// Encoder profile
    #[arg(long, value_enum, default_value_t = EncoderKind::X265)]
    pub encoder: EncoderKind,

    /// Encoder threads (default: REDACTO_ENCODER_THREADS or all CPUs)
    #[arg(long, value_name = "COUNT")]
    pub threads: Option<usize>,

    // --- Staging ---
    /// Directory in which the per-run frame directory is created
    /// (default: REDACTO_STAGING_DIR or the current directory)
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Remove staged frames when the run fails instead of keeping them
    #[arg(long, default_value_t = false)]
    pub clean_on_failure: bool,

    /// Frames detected and blurred in parallel per batch (default:
    /// REDACTO_BATCH_SIZE or 1)
    #[arg(long, value_name = "FRAMES")]
    pub batch_size: Option<usize>,

    /// Print progress as JSON lines on stdout instead of a progress bar
    #[arg(long, default_value_t = false)]
    pub json_progress: bool,
}
