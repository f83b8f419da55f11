//! Implementation of the 'check' subcommand.
//!
//! Verifies that every external tool the pipeline shells out to can be run,
//! and that ffmpeg is recent enough for the decoder's arguments.

use crate::error::CliResult;

use console::style;
use redacto_core::external::{REQUIRED_TOOLS, check_dependency, check_ffmpeg_version};

/// Prints the version of each required tool. Fails with the first missing one
/// after every tool has been checked.
pub fn run_check() -> CliResult<()> {
    let mut first_error = None;
    for tool in REQUIRED_TOOLS {
        let checked = check_dependency(tool).and_then(|version| {
            if tool == "ffmpeg" {
                check_ffmpeg_version(&version)?;
            }
            Ok(version)
        });
        match checked {
            Ok(version) => println!("{} {}: {}", style("✓").green(), tool, version),
            Err(e) => {
                println!("{} {}: {}", style("✗").red(), tool, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
