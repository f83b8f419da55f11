use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::path::{Path, PathBuf};
use anyhow::Result;

/// Prefix of per-run log files.
pub const LOG_FILE_PREFIX: &str = "redacto_run_";

/// Path of the log file for a run started at `timestamp` (`YYYYMMDD_HHMMSS`).
pub fn run_log_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("{LOG_FILE_PREFIX}{timestamp}.log"))
}

/// Routes all log records to stderr and to `log_file`.
///
/// Installs the global logger, so it can succeed at most once per process.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    // Create log directory if it doesn't exist
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {m}{n}")))
        .build();

    // File appender with clean format for log files
    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}"
        )))
        .build(log_file)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_path() {
        let path = run_log_path(Path::new("/var/log/redacto"), "20260101_120000");
        assert_eq!(path, PathBuf::from("/var/log/redacto/redacto_run_20260101_120000.log"));
    }
}
