//! Error types for the CLI

use std::path::PathBuf;

use interpreter::{ConfigError, KaiError};
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Parse or runtime failure inside the program
    #[error("{0}")]
    Kai(#[from] KaiError),

    /// Unreadable program file
    #[error("could not read file '{}': {source}", .path.display())]
    Io {
        /// Program path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Bad configuration file
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
