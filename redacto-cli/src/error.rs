// ============================================================================
// redacto-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Reporting core errors to the user
//
// The CLI uses CoreError throughout. A failed run prints a one-line
// diagnosis to stderr, an optional hint, and exits with the status
// CoreError::exit_code assigns to the error's class.
//
// AI-ASSISTANT-INFO: CLI error reporting and exit codes

// ---- Internal crate imports ----
use redacto_core::{CoreError, CoreResult};

// ---- External crate imports ----
use console::style;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// A short suggestion for errors the user can usually fix themselves.
pub fn suggestion(error: &CoreError) -> Option<&'static str> {
    match error {
        CoreError::ModelLoad { .. } => {
            Some("pass --classifier or --model with the path of an existing model file")
        }
        CoreError::DependencyNotFound(_) => Some("install ffmpeg and make sure it is on PATH"),
        CoreError::DependencyVersion { .. } => Some("install ffmpeg 5.1 or newer"),
        CoreError::SourceOpen { .. } => Some("check that the input exists and is a readable video"),
        CoreError::Encode { .. } => Some("run with --verbose to see the full encoder command"),
        _ => None,
    }
}

/// Prints `error` and its hint to stderr.
pub fn print_error(error: &CoreError) {
    eprintln!("{} {}", style("Error:").red().bold(), error);
    if let Some(hint) = suggestion(error) {
        eprintln!("{} {}", style("Hint:").yellow(), hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions() {
        let err = CoreError::ModelLoad {
            path: "missing.onnx".to_string(),
            reason: "not found".to_string(),
        };
        assert!(suggestion(&err).unwrap().contains("--model"));
        assert!(suggestion(&CoreError::Cancelled { frames_staged: 3 }).is_none());
    }
}
