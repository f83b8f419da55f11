// ============================================================================
// redacto-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and file logging for the CLI
//
// Without --log-dir the CLI logs to stderr through env_logger with coloured
// level tags. With --log-dir, log4rs (configured in redacto-core) writes the
// same records to stderr and to a timestamped file in that directory.
//
// RUST_LOG overrides the level chosen by --verbose for console-only logging.
//
// AI-ASSISTANT-INFO: Logger initialisation and timestamp helper

use crate::error::CliResult;
use console::style;
use log::LevelFilter;
use redacto_core::CoreError;
use redacto_core::file_logging::{run_log_path, setup_file_logging};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. Returns the log file path when file logging
/// was requested.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> CliResult<Option<PathBuf>> {
    let level = level_for(verbose);

    if let Some(dir) = log_dir {
        let log_file = run_log_path(dir, &get_timestamp());
        setup_file_logging(&log_file, level).map_err(|e| {
            CoreError::Configuration(format!(
                "failed to set up log file {}: {e}",
                log_file.display()
            ))
        })?;
        return Ok(Some(log_file));
    }

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let level = match record.level() {
                log::Level::Error => style("ERROR").red().bold(),
                log::Level::Warn => style("WARN ").yellow(),
                log::Level::Info => style("INFO ").green(),
                log::Level::Debug => style("DEBUG").blue(),
                log::Level::Trace => style("TRACE").magenta(),
            };
            writeln!(buf, "{} {}", level.for_stderr(), record.args())
        })
        .init();
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format() {
        let ts = get_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_verbose_selects_debug() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Info);
    }
}
