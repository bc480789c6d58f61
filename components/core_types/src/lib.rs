//! Core Kai value types and error handling.
//!
//! This crate provides the foundational types shared by every Kai component:
//! value representation, interned symbols, the parsed expression tree and the
//! control-flow signals the evaluator propagates.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of Kai values
//! - [`Tag`] - The fixed set of value kinds
//! - [`Symbol`] / [`SymbolTable`] - Interned identifiers
//! - [`Expr`] - The parsed tree the evaluator walks
//! - [`Exception`] / [`ErrorKind`] - Kai errors
//! - [`Signal`] - Non-value results (errors and early returns)
//! - [`CallProfile`] / [`CompiledCode`] - Hot-path profiling and compiled entry points
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, Exception, SymbolTable, Tag, Value};
//!
//! let mut symbols = SymbolTable::new();
//! let x = symbols.intern("x");
//! assert_eq!(x, symbols.intern("x"));
//!
//! let num = Value::Integer(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.tag(), Tag::Integer);
//!
//! let error = Exception::type_error("cannot add a string to an integer");
//! assert_eq!(error.kind, ErrorKind::TypeError);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod ast;
mod error;
mod profile;
mod source;
mod symbol;
mod value;

pub use ast::{CatchClause, Datum, Expr, LambdaExpr, Literal};
pub use error::{ErrorKind, EvalResult, Exception, Signal};
pub use profile::{CallProfile, CompiledCode, CompiledState, Primitive, PrimitiveGuard};
pub use source::SourcePosition;
pub use symbol::{Symbol, SymbolTable};
pub use value::{HeapId, Tag, Value};
