// redacto-cli/src/main.rs
//
// Entry point of the `redacto` binary: parses arguments, runs the selected
// command and turns a failure into a diagnosis on stderr plus the exit
// status of its error class.

use clap::Parser;
use redacto_cli::Cli;
use redacto_cli::error::print_error;
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = redacto_cli::run(cli) {
        log::debug!("Exiting with status {} ({})", e.exit_code(), e.category());
        print_error(&e);
        process::exit(e.exit_code());
    }
}
