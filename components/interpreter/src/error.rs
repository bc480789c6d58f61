//! Errors surfaced to embedding hosts

use core_types::{ErrorKind, Exception};
use parser::ParseError;
use thiserror::Error;

use crate::config::ConfigError;

/// Why a host call into the runtime failed
#[derive(Debug, Error)]
pub enum KaiError {
    /// The source text is not a valid program
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Evaluation raised an error no `try` intercepted
    #[error("{0}")]
    Raised(#[from] Exception),

    /// The runtime configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KaiError {
    /// Kind of the raised error, if evaluation got that far
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            KaiError::Raised(exception) => Some(exception.kind),
            _ => None,
        }
    }

    /// The raised error itself
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            KaiError::Raised(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<memory_manager::OutOfMemory> for KaiError {
    fn from(error: memory_manager::OutOfMemory) -> Self {
        KaiError::Raised(error.into())
    }
}
