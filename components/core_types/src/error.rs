//! Kai error types and control-flow signals.
//!
//! Errors are not a secondary return channel: they travel as
//! [`Signal::Raise`] through the same `Result` every evaluation site already
//! propagates, next to [`Signal::Return`] for early exits.

use std::fmt;

use thiserror::Error;

use crate::Value;

/// The kind of Kai error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lookup or assignment of a name with no binding
    UnboundVariable,
    /// Call with the wrong number of arguments
    ArityError,
    /// Operation applied to an incompatible tag
    TypeError,
    /// Native module could not be found or loaded
    ModuleLoadError,
    /// Allocation could not be satisfied after collection
    OutOfMemory,
    /// Raised by evaluated code
    UserRaised,
}

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::UnboundVariable,
        ErrorKind::ArityError,
        ErrorKind::TypeError,
        ErrorKind::ModuleLoadError,
        ErrorKind::OutOfMemory,
        ErrorKind::UserRaised,
    ];

    /// Name used in messages and by `catch` clauses
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::UnboundVariable => "UnboundVariable",
            ErrorKind::ArityError => "ArityError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ModuleLoadError => "ModuleLoadError",
            ErrorKind::OutOfMemory => "OutOfMemory",
            ErrorKind::UserRaised => "UserRaised",
        }
    }

    /// Parse a kind from its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether in-language `try` may intercept this kind
    pub fn is_recoverable(self) -> bool {
        self != ErrorKind::OutOfMemory
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Kai error with message, payload and the calls it unwound through.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, Exception};
///
/// let error = Exception::unbound("y");
/// assert_eq!(error.kind, ErrorKind::UnboundVariable);
/// assert_eq!(error.to_string(), "UnboundVariable: unbound variable 'y'");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct Exception {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Value attached by `raise`, or nil
    pub payload: Value,
    /// Names of the functions unwound through, innermost first
    pub stack: Vec<String>,
}

impl Exception {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: Value::Nil,
            stack: Vec::new(),
        }
    }

    /// Unbound name
    pub fn unbound(name: &str) -> Self {
        Self::new(
            ErrorKind::UnboundVariable,
            format!("unbound variable '{}'", name),
        )
    }

    /// Wrong argument count
    pub fn arity(callee: &str, expected: impl fmt::Display, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityError,
            format!("{} expects {} argument(s), got {}", callee, expected, got),
        )
    }

    /// Incompatible tag
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Allocation failure
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfMemory, message)
    }

    /// Native module failure
    pub fn module_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleLoadError, message)
    }

    /// Language-level raise carrying `payload`
    pub fn user(payload: Value, message: impl Into<String>) -> Self {
        Self {
            payload,
            ..Self::new(ErrorKind::UserRaised, message)
        }
    }
}

/// A non-value evaluation result.
#[derive(Debug, Clone)]
pub enum Signal {
    /// An error unwinding towards an interceptor
    Raise(Exception),
    /// `return` unwinding towards the enclosing block or function body
    Return(Value),
}

impl From<Exception> for Signal {
    fn from(exception: Exception) -> Self {
        Signal::Raise(exception)
    }
}

/// Result of evaluating an expression
pub type EvalResult = Result<Value, Signal>;
