// redacto-cli/src/lib.rs
//
// Library portion of the Redacto CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, RedactArgs};
pub use commands::check::run_check;
pub use commands::redact::{run_redact, run_redact_with};
pub use error::CliResult;

/// Sets up logging and runs the selected command.
pub fn run(cli: Cli) -> CliResult<()> {
    let log_file = logging::init_logging(cli.verbose, cli.log_dir.as_deref())?;
    if let Some(path) = &log_file {
        log::info!("Logging to {}", path.display());
    }

    match cli.command {
        Commands::Redact(args) => run_redact(args, log_file.is_some()).map(|_| ()),
        Commands::Check => run_check(),
    }
}
