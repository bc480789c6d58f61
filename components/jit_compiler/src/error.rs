//! JIT compilation errors

use interpreter::BackendError;
use thiserror::Error;

/// Why a function could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The body leaves the compilable subset
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Cranelift rejected the generated function
    #[error("code generation failed: {0}")]
    Codegen(String),
}

impl CompileError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        CompileError::Unsupported(message.into())
    }

    pub(crate) fn codegen(error: impl std::fmt::Display) -> Self {
        CompileError::Codegen(error.to_string())
    }
}

impl From<CompileError> for BackendError {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::Unsupported(message) => BackendError::Unsupported(message),
            CompileError::Codegen(message) => BackendError::Codegen(message),
        }
    }
}
