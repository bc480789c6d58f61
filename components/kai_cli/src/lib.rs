//! Kai command-line runner
//!
//! Argument parsing, configuration layering, logging setup and the
//! [`Session`] that drives one runtime for the `kai` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::{build_config, Session};
