//! Integration test suite for the Kai runtime
//!
//! This crate provides integration tests that verify components work
//! together across crate boundaries.

use interpreter::{Runtime, RuntimeConfig};

/// Re-export components for test convenience
pub mod components {
    pub use core_types;
    pub use interpreter;
    pub use jit_compiler;
    pub use kai_cli;
    pub use memory_manager;
    pub use module_loader;
    pub use parser;
}

/// An interpreter-only runtime with default settings
pub fn interpreted() -> Runtime {
    runtime(RuntimeConfig::default().with_jit_enabled(false))
}

/// A runtime built from `config`
pub fn runtime(config: RuntimeConfig) -> Runtime {
    match Runtime::new(config) {
        Ok(rt) => rt,
        Err(error) => panic!("runtime construction failed: {}", error),
    }
}

/// Evaluate `source` and render the result with the runtime printer
pub fn eval_display(rt: &mut Runtime, source: &str) -> String {
    match rt.eval_str(source) {
        Ok(value) => rt.display(value),
        Err(error) => panic!("{} failed: {}", source, error),
    }
}
