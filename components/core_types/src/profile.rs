//! Profiling data and compiled entry points for JIT decisions
//!
//! This module is placed in core_types to avoid cyclic dependencies
//! between interpreter and jit_compiler: function objects in the heap carry a
//! [`CallProfile`], and the backend hands back [`CompiledCode`] the
//! interpreter can invoke without knowing the code generator.

use std::fmt;
use std::sync::Arc;

use crate::{Symbol, Value};

/// Builtin operations the prelude marks on its native functions.
///
/// The native backend only lowers calls whose operator resolves to one of
/// these markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `=`
    NumEq,
    /// `not`
    Not,
}

/// A symbol a compiled body assumed to resolve to a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveGuard {
    /// Operator symbol as written in the body
    pub symbol: Symbol,
    /// Primitive it resolved to at compile time
    pub primitive: Primitive,
}

/// Native code produced for a function body.
///
/// Compiled entries only accept Integer arguments; the caller checks the
/// arguments and the [`guards`](CompiledCode::guards) before invoking.
pub trait CompiledCode: Send + Sync + fmt::Debug {
    /// Number of parameters
    fn arity(&self) -> usize;

    /// Bindings that must still resolve to the same primitives
    fn guards(&self) -> &[PrimitiveGuard];

    /// Run the compiled body on integer arguments
    fn invoke(&self, args: &[i64]) -> Value;
}

/// Compilation state of a function
#[derive(Debug, Clone, Default)]
pub enum CompiledState {
    /// Not compiled yet
    #[default]
    Interpreted,
    /// The backend declined; never retried
    Failed,
    /// Native entry available
    Ready(Arc<dyn CompiledCode>),
}

/// Profiling data for a function
///
/// Collects call counts to decide when to ask for native code.
#[derive(Debug, Clone, Default)]
pub struct CallProfile {
    /// Number of interpreted calls so far
    pub calls: u64,
    /// Compilation state
    pub compiled: CompiledState,
}

impl CallProfile {
    /// Create new empty profile data
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call and return the new count
    pub fn record_call(&mut self) -> u64 {
        self.calls += 1;
        self.calls
    }

    /// Whether the function is due for compilation at `threshold` calls
    pub fn should_compile(&self, threshold: u64) -> bool {
        matches!(self.compiled, CompiledState::Interpreted) && self.calls >= threshold
    }

    /// The native entry, if compiled
    pub fn compiled_code(&self) -> Option<&Arc<dyn CompiledCode>> {
        match &self.compiled {
            CompiledState::Ready(code) => Some(code),
            _ => None,
        }
    }
}
