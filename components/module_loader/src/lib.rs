//! Native extension modules for Kai
//!
//! A module is a named set of native functions. Hosts either register a
//! [`NativeModule`] implementation in process, or ship a dynamic library
//! exporting a [`ModuleDeclaration`] built with [`export_module!`].
//!
//! Resolution only locates a module; the module's own code first runs when
//! [`ModuleLoader::load`] calls its registration function.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use core_types::{Exception, Value};
//! use memory_manager::{Arity, Heap};
//! use module_loader::{ModuleLoader, ModuleRegistrar, NativeModule};
//!
//! struct Answers;
//!
//! fn answer(_: &mut Heap, _: &[Value]) -> Result<Value, Exception> {
//!     Ok(Value::Integer(42))
//! }
//!
//! impl NativeModule for Answers {
//!     fn name(&self) -> &str {
//!         "answers"
//!     }
//!
//!     fn register(&self, registrar: &mut ModuleRegistrar) {
//!         registrar.function("answer", Arity::exact(0), answer);
//!     }
//! }
//!
//! let mut loader = ModuleLoader::new(Vec::new());
//! loader.register_static(Arc::new(Answers));
//!
//! let module = loader.load("answers").unwrap();
//! assert_eq!(module.functions[0].name, "answer");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod error;
pub mod loader;

pub use abi::{
    ModuleDeclaration, ModuleEntry, ModuleRegistrar, NativeModule, ABI_VERSION, CORE_VERSION,
    DECLARATION_SYMBOL,
};
pub use error::ModuleLoadError;
pub use loader::{LoadedFunction, LoadedModule, ModuleLoader, ModuleSource};
