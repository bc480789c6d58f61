//! The embedding API.
//!
//! A [`Runtime`] owns one heap, the global frame with the prelude bound in
//! it, the module loader and an optional native backend. Hosts parse and
//! evaluate through it, call Kai functions, and pin values they keep
//! between evaluations.

use std::collections::BTreeMap;
use std::sync::Arc;

use core_types::{Expr, HeapId, Signal, Symbol, Value};
use memory_manager::{Arity, GcStats, Heap, NativeFn};
use module_loader::{ModuleLoader, NativeModule};

use crate::backend::CompilerBackend;
use crate::config::RuntimeConfig;
use crate::error::KaiError;
use crate::eval::Evaluator;
use crate::{prelude, scope};

/// A Kai runtime instance
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use interpreter::{Runtime, RuntimeConfig};
///
/// let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();
/// let value = runtime
///     .eval_str("(define (inc n) (+ n 1)) (inc 41)")
///     .unwrap();
/// assert_eq!(value, Value::Integer(42));
/// ```
pub struct Runtime {
    pub(crate) heap: Heap,
    pub(crate) global: HeapId,
    pub(crate) config: RuntimeConfig,
    pub(crate) pins: Vec<Value>,
    /// Installed module tables by module name
    pub(crate) modules: BTreeMap<Symbol, Value>,
    // Dropped after the heap, whose natives may point into loaded libraries.
    pub(crate) loader: ModuleLoader,
    pub(crate) backend: Option<Box<dyn CompilerBackend>>,
}

impl Runtime {
    /// Create a runtime with the prelude installed
    pub fn new(config: RuntimeConfig) -> Result<Self, KaiError> {
        let mut heap = Heap::with_config(config.heap_config());
        let global = heap.alloc_frame(None)?;
        prelude::install(&mut heap, global)?;

        tracing::debug!(
            builtins = prelude::names().count(),
            gc_threshold = config.gc_threshold,
            jit = config.jit_enabled,
            "runtime created"
        );

        Ok(Self {
            loader: ModuleLoader::new(config.module_paths.clone()),
            heap,
            global,
            config,
            pins: Vec::new(),
            modules: BTreeMap::new(),
            backend: None,
        })
    }

    /// The configuration this runtime was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the heap.
    ///
    /// Values allocated here are unrooted until they are pinned or stored in
    /// something reachable.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The global frame
    pub fn global_frame(&self) -> HeapId {
        self.global
    }

    /// Install a native compilation backend
    pub fn set_backend(&mut self, backend: Box<dyn CompilerBackend>) {
        tracing::debug!(backend = backend.name(), "backend installed");
        self.backend = Some(backend);
    }

    /// Whether a backend is installed
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// The module loader
    pub fn loader_mut(&mut self) -> &mut ModuleLoader {
        &mut self.loader
    }

    // ---- evaluation ----

    /// Parse `source` against this runtime's symbol table
    pub fn parse(&mut self, source: &str) -> Result<Vec<Expr>, KaiError> {
        Ok(parser::parse_program(source, self.heap.symbols_mut())?)
    }

    /// Evaluate one top-level expression in the global frame
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, KaiError> {
        let global = self.global;
        let result = Evaluator::new(self).evaluate(expr, global);
        match result {
            Ok(value) | Err(Signal::Return(value)) => {
                self.boundary(value);
                Ok(value)
            }
            Err(Signal::Raise(exception)) => {
                tracing::debug!(kind = %exception.kind, message = %exception.message, "uncaught error");
                self.boundary(exception.payload);
                Err(KaiError::Raised(exception))
            }
        }
    }

    /// Evaluate expressions in order, returning the last value
    pub fn evaluate_all(&mut self, program: &[Expr]) -> Result<Value, KaiError> {
        let mut result = Value::Nil;
        for expr in program {
            result = self.evaluate(expr)?;
        }
        Ok(result)
    }

    /// Parse and evaluate `source`
    pub fn eval_str(&mut self, source: &str) -> Result<Value, KaiError> {
        let program = self.parse(source)?;
        self.evaluate_all(&program)
    }

    /// Apply a callable value to `args`
    pub fn call(&mut self, callee: Value, args: &[Value]) -> Result<Value, KaiError> {
        let result = Evaluator::new(self).call(callee, args);
        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Raise(exception)) => Err(KaiError::Raised(exception)),
        }
    }

    /// Collect at a top-level boundary when the policy and threshold say so
    fn boundary(&mut self, result: Value) {
        if self.config.collect_between_evaluations && self.heap.should_collect() {
            let mut roots: Vec<Value> = self.roots().collect();
            roots.push(result);
            self.heap.collect(roots);
        }
    }

    // ---- globals ----

    /// Intern `name`
    pub fn symbol(&mut self, name: &str) -> Symbol {
        self.heap.intern(name)
    }

    /// Value bound to `name` in the global frame
    pub fn global(&self, name: &str) -> Option<Value> {
        let symbol = self.heap.symbols().get(name)?;
        self.heap.frame(self.global).bindings.get(&symbol).copied()
    }

    /// Bind `name` in the global frame
    pub fn define_global(&mut self, name: &str, value: Value) {
        let symbol = self.heap.intern(name);
        scope::define(&mut self.heap, self.global, symbol, value);
    }

    /// Bind a host function in the global frame
    pub fn define_native(
        &mut self,
        name: &str,
        arity: Arity,
        entry: NativeFn,
    ) -> Result<Value, KaiError> {
        let value = self.heap.alloc_native(name, arity, entry, None)?;
        self.define_global(name, value);
        Ok(value)
    }

    // ---- modules ----

    /// Make an in-process module available to `require`
    pub fn register_module(&mut self, module: Arc<dyn NativeModule>) {
        self.loader.register_static(module);
    }

    /// Load module `name` as `(require name)` would
    pub fn install_module(&mut self, name: &str) -> Result<Value, KaiError> {
        let symbol = self.heap.intern(name);
        let result = Evaluator::new(self).require(symbol);
        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Raise(exception)) => Err(KaiError::Raised(exception)),
        }
    }

    // ---- memory ----

    /// Keep `value` alive across evaluations
    pub fn pin(&mut self, value: Value) {
        self.pins.push(value);
    }

    /// Drop one pin of `value`; returns whether it was pinned
    pub fn unpin(&mut self, value: Value) -> bool {
        match self.pins.iter().position(|pinned| *pinned == value) {
            Some(index) => {
                self.pins.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Run a full collection now
    pub fn collect(&mut self) -> GcStats {
        let roots: Vec<Value> = self.roots().collect();
        self.heap.collect(roots);
        self.heap.stats()
    }

    /// Heap statistics
    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    /// Roots owned by the runtime itself
    pub(crate) fn roots(&self) -> impl Iterator<Item = Value> + '_ {
        std::iter::once(Value::Frame(self.global))
            .chain(self.pins.iter().copied())
            .chain(self.modules.values().copied())
    }

    // ---- values ----

    /// Printed form of `value`
    pub fn display(&self, value: Value) -> String {
        memory_manager::display(&self.heap, value)
    }

    /// Structural equality as used by `equal?`
    pub fn structurally_equal(&self, a: Value, b: Value) -> bool {
        memory_manager::structurally_equal(&self.heap, a, b)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("global", &self.global)
            .field("live_objects", &self.heap.live_objects())
            .field("pins", &self.pins.len())
            .field("backend", &self.backend.as_ref().map(|backend| backend.name()))
            .finish_non_exhaustive()
    }
}
