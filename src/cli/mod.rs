//! CLI module
//!
//! Command-line interface of the tap.
//!
//! # Modes
//!
//! - `--discover` - Print the catalog of available streams
//! - default - Sync the selected streams to stdout

mod commands;
mod runner;

pub use commands::{Cli, Mode};
pub use runner::Runner;
