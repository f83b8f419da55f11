//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Module containing the implementation of the `check` command.
pub mod check;

/// Module containing the implementation of the `redact` command.
/// Blurs detected faces in a video and re-encodes it.
pub mod redact;
