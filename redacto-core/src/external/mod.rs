// ============================================================================
// redacto-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates process-level interaction with the external
// media tools. The encoder is written against the FfmpegSpawner and
// FfmpegProcess traits so that tests can inject a mock process; dependency
// checking lets the CLI fail early with a clear message when a tool is
// missing from PATH.
//
// AI-ASSISTANT-INFO: External tool interactions and abstractions for ffmpeg/ffprobe

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Mock spawner for tests
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    FfmpegProcess, FfmpegSpawner, ProcessOutcome, SidecarProcess, SidecarSpawner,
    run_collecting_diagnostics,
};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// External tools the pipeline cannot run without.
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Checks that `cmd_name` can be executed, returning the first line of its
/// `-version` output.
///
/// # Errors
///
/// * `CoreError::DependencyNotFound` - If the command is not on PATH
/// * `CoreError::CommandStart` - If the command exists but fails to start
pub fn check_dependency(cmd_name: &str) -> CoreResult<String> {
    let output = Command::new(cmd_name)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string();
            log::debug!("Found dependency {}: {}", cmd_name, version);
            Ok(version)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Oldest ffmpeg release with `-fps_mode`, which the frame decoder passes.
pub const MIN_FFMPEG_VERSION: (u32, u32) = (5, 1);

/// Extracts `(major, minor)` from the first line of `ffmpeg -version`.
///
/// Release builds print `ffmpeg version 6.1.1-...` or `ffmpeg version
/// n5.1.2`; git snapshots (`N-112345-g...`) carry no release number and
/// yield `None`.
pub fn parse_ffmpeg_version(version_line: &str) -> Option<(u32, u32)> {
    let token = version_line
        .trim()
        .strip_prefix("ffmpeg version ")?
        .split_whitespace()
        .next()?
        .trim_start_matches(|c: char| c.is_ascii_alphabetic());

    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(part) => {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()?
        }
        None => 0,
    };
    Some((major, minor))
}

/// Fails if the reported ffmpeg release predates [`MIN_FFMPEG_VERSION`].
///
/// Versions that cannot be parsed are accepted with a warning.
pub fn check_ffmpeg_version(version_line: &str) -> CoreResult<()> {
    let (req_major, req_minor) = MIN_FFMPEG_VERSION;
    match parse_ffmpeg_version(version_line) {
        Some(found) if found < MIN_FFMPEG_VERSION => Err(CoreError::DependencyVersion {
            tool: "ffmpeg".to_string(),
            found: format!("{}.{}", found.0, found.1),
            required: format!("{req_major}.{req_minor}"),
        }),
        Some(_) => Ok(()),
        None => {
            log::warn!(
                "Could not determine the ffmpeg release from '{}'; {}.{} or newer is required",
                version_line,
                req_major,
                req_minor
            );
            Ok(())
        }
    }
}
