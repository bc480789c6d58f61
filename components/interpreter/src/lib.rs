//! Frame-based evaluator for Kai
//!
//! This crate provides the runtime core that hosts embed:
//! - Tree-walking evaluation over lexically scoped frames
//! - The prelude of builtin native functions
//! - Structured errors intercepted by `try`
//! - Native modules loaded through `require`
//! - A seam for an optional native compilation backend
//!
//! # Example
//!
//! ```
//! use core_types::Value;
//! use interpreter::{Runtime, RuntimeConfig};
//!
//! let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();
//! let result = runtime
//!     .eval_str("(let ((x 2) (y 3)) (* x y))")
//!     .unwrap();
//! assert_eq!(result, Value::Integer(6));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
mod eval;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod shared;

// Re-export main types at crate root
pub use backend::{BackendError, CompileRequest, CompilerBackend};
pub use config::{ConfigError, RuntimeConfig};
pub use error::KaiError;
pub use runtime::Runtime;
pub use shared::SharedRuntime;
