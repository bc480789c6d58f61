//! Native compilation backend for the Kai runtime
//!
//! This crate provides:
//! - Lowering of function bodies into a typed integer IR
//! - Cranelift code generation for that IR
//! - A versioned cache of compiled entries keyed by content fingerprint
//!
//! Bodies outside the subset are declined and keep running in the
//! interpreter.
//!
//! # Example
//!
//! ```
//! use core_types::Value;
//! use interpreter::{Runtime, RuntimeConfig};
//! use jit_compiler::CraneliftBackend;
//!
//! let mut runtime = Runtime::new(RuntimeConfig::default().with_jit_threshold(2)).unwrap();
//! runtime.set_backend(Box::new(CraneliftBackend::new().unwrap()));
//!
//! runtime.eval_str("(define (double x) (* x 2))").unwrap();
//! for _ in 0..5 {
//!     assert_eq!(runtime.eval_str("(double 21)").unwrap(), Value::Integer(42));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod compiled;
pub mod cranelift_backend;
pub mod error;
pub mod ir;

// Re-export main types at crate root
pub use cache::{fingerprint, CacheStats, CodeCache, BACKEND_VERSION};
pub use compiled::NativeCode;
pub use cranelift_backend::CraneliftBackend;
pub use error::CompileError;
pub use ir::{IrExpr, IrFunction, JitType};
