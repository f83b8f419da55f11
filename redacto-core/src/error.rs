// ============================================================================
// redacto-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the redaction pipeline
//
// Every fatal condition of a pipeline run maps onto exactly one CoreError
// variant, and every variant maps onto a distinct process exit status so the
// CLI never reports a silent partial success.
//
// AI-ASSISTANT-INFO: Error taxonomy and exit-status mapping for redacto-core

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the redaction pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration, rejected before any frame work begins.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The detector (cascade XML or ONNX model) could not be constructed.
    #[error("Failed to load detection model '{path}': {reason}")]
    ModelLoad { path: String, reason: String },

    /// The input video could not be opened or is unsupported.
    #[error("Failed to open input '{path}': {reason}")]
    SourceOpen { path: String, reason: String },

    /// A frame could not be decoded mid-stream.
    #[error("Failed to decode frame {index}: {reason}")]
    FrameDecode { index: u64, reason: String },

    /// The detector failed on a specific frame.
    #[error("Detection failed on frame {index}: {reason}")]
    Detection { index: u64, reason: String },

    /// Blurring a detected region failed.
    #[error("Redaction failed on frame {index}: {reason}")]
    Redaction { index: u64, reason: String },

    /// The staging area could not be created or written.
    #[error("Staging error: {0}")]
    Staging(String),

    /// The external encoder exited unsuccessfully.
    #[error("Encoding failed ({status}):\n{diagnostics}")]
    Encode { status: String, diagnostics: String },

    /// The input produced no frames at all.
    #[error("Input '{0}' contains no decodable video frames")]
    EmptyInput(String),

    /// A stop request was observed between frames.
    #[error("Pipeline cancelled after {frames_staged} staged frame(s)")]
    Cancelled { frames_staged: u64 },

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, io::Error),

    #[error("Command '{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Required dependency '{0}' was not found")]
    DependencyNotFound(String),

    #[error("{tool} {found} is too old; {required} or newer is required")]
    DependencyVersion {
        tool: String,
        found: String,
        required: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for redacto-core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Process exit status for this failure class.
    ///
    /// Each class gets its own code, so wrapper scripts can tell a bad model
    /// from a failed encode without parsing stderr. Encoder failures use 4.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Configuration(_) => 2,
            CoreError::ModelLoad { .. } => 3,
            CoreError::Encode { .. } => 4,
            CoreError::SourceOpen { .. } => 5,
            CoreError::FrameDecode { .. } => 6,
            CoreError::Detection { .. } => 7,
            CoreError::Staging(_) | CoreError::Io(_) => 8,
            CoreError::EmptyInput(_) => 9,
            CoreError::CommandStart(..)
            | CoreError::CommandWait(..)
            | CoreError::CommandFailed { .. }
            | CoreError::DependencyNotFound(_)
            | CoreError::DependencyVersion { .. } => 10,
            CoreError::Redaction { .. } => 11,
            CoreError::Cancelled { .. } => 130,
        }
    }

    /// Short human-readable category, used as the title of error events.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Configuration(_) => "Configuration error",
            CoreError::ModelLoad { .. } => "Model load error",
            CoreError::SourceOpen { .. } => "Source open error",
            CoreError::FrameDecode { .. } => "Frame decode error",
            CoreError::Detection { .. } => "Detection error",
            CoreError::Redaction { .. } => "Redaction error",
            CoreError::Staging(_) | CoreError::Io(_) => "Staging error",
            CoreError::Encode { .. } => "Encode error",
            CoreError::EmptyInput(_) => "Empty input",
            CoreError::Cancelled { .. } => "Cancelled",
            CoreError::CommandStart(..)
            | CoreError::CommandWait(..)
            | CoreError::CommandFailed { .. }
            | CoreError::DependencyNotFound(_)
            | CoreError::DependencyVersion { .. } => "External command error",
        }
    }
}

/// Builds a [`CoreError::CommandStart`] for a process that could not be spawned.
pub fn command_start_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(command.into(), err)
}

/// Builds a [`CoreError::CommandWait`] for a process whose exit could not be collected.
pub fn command_wait_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(command.into(), err)
}

/// Builds a [`CoreError::CommandFailed`] from an exit status and captured stderr.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status: status.to_string(),
        stderr: stderr.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fatal_classes_have_distinct_nonzero_exit_codes() {
        let errors = vec![
            CoreError::Configuration("bad".into()),
            CoreError::ModelLoad { path: "m".into(), reason: "r".into() },
            CoreError::Encode { status: "1".into(), diagnostics: String::new() },
            CoreError::SourceOpen { path: "in".into(), reason: "r".into() },
            CoreError::FrameDecode { index: 3, reason: "r".into() },
            CoreError::Detection { index: 3, reason: "r".into() },
            CoreError::Redaction { index: 3, reason: "r".into() },
            CoreError::Staging("s".into()),
            CoreError::EmptyInput("in".into()),
            CoreError::DependencyNotFound("ffmpeg".into()),
            CoreError::Cancelled { frames_staged: 0 },
        ];

        let codes: HashSet<i32> = errors.iter().map(CoreError::exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn test_encode_error_keeps_diagnostics_verbatim() {
        let err = CoreError::Encode {
            status: "exit status: 1".into(),
            diagnostics: "Unknown encoder 'libx265'".into(),
        };
        assert!(err.to_string().contains("Unknown encoder 'libx265'"));
        assert_eq!(err.exit_code(), 4);
    }
}
