//! Quality Gate CLI
//!
//! Library half of the `qgate` binary: argument definitions, subscriber
//! setup and subcommand execution. Exit status is 0 when the gate passes,
//! 1 when it fails and 2 for malformed input or operational errors.

#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod logging;

pub use app::{run, EXIT_ERROR, EXIT_FAIL, EXIT_PASS};
pub use cli::{command, LogFormat, DEFAULT_STATE_PATH};
