//! The seam to an optional native compilation backend.
//!
//! The evaluator owns hotness tracking and guard checks; a backend only
//! turns a function body into [`CompiledCode`] or declines.

use std::sync::Arc;

use core_types::{CompiledCode, LambdaExpr, Primitive, Symbol};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Why a backend declined a function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The body uses a construct outside the compilable subset
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Code generation itself failed
    #[error("code generation failed: {0}")]
    Codegen(String),
}

/// What the evaluator hands to a backend
#[derive(Debug)]
pub struct CompileRequest<'a> {
    /// Function code
    pub code: &'a LambdaExpr,
    /// Free symbols of the body that currently resolve to prelude primitives
    pub primitives: &'a FxHashMap<Symbol, Primitive>,
}

/// A native code generator
pub trait CompilerBackend: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Compile `request`, or explain why not.
    ///
    /// The returned code must record, as guards, every primitive it assumed.
    fn compile(&mut self, request: &CompileRequest<'_>) -> Result<Arc<dyn CompiledCode>, BackendError>;
}
