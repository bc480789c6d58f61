//! The tree-walking evaluator.
//!
//! Every heap value the evaluator holds across a possible collection is
//! kept on one of two shadow stacks: `frames` for environments of active
//! calls and scopes, `temporaries` for evaluated operators, arguments and
//! partially built data. Collections only happen at call entry (the
//! safepoint) or when an allocation fails, and both pass these stacks as
//! roots.

use std::sync::Arc;

use core_types::{
    CompiledCode, CompiledState, Datum, ErrorKind, EvalResult, Exception, Expr, HeapId,
    LambdaExpr, Literal, Primitive, Signal, Symbol, Value,
};
use memory_manager::{display, CollectionReport, Heap, OutOfMemory};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::CompileRequest;
use crate::runtime::Runtime;
use crate::scope;

/// Minimum stack space to keep available before recursing
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// One evaluator chain over a runtime
pub(crate) struct Evaluator<'rt> {
    rt: &'rt mut Runtime,
    frames: Vec<HeapId>,
    temporaries: Vec<Value>,
    depth: usize,
}

impl<'rt> Evaluator<'rt> {
    pub(crate) fn new(rt: &'rt mut Runtime) -> Self {
        Self {
            rt,
            frames: Vec::new(),
            temporaries: Vec::new(),
            depth: 0,
        }
    }

    /// Evaluate a top-level expression in `env`
    pub(crate) fn evaluate(&mut self, expr: &Expr, env: HeapId) -> EvalResult {
        self.with_frame(env, |ev| ev.eval(expr, env))
    }

    /// Apply `callee` to host-supplied arguments
    pub(crate) fn call(&mut self, callee: Value, args: &[Value]) -> EvalResult {
        let mark = self.temporaries.len();
        self.temporaries.push(callee);
        self.temporaries.extend_from_slice(args);
        let result = self.apply(callee, args);
        self.temporaries.truncate(mark);
        result
    }

    /// Load module `name` and bind its table in the global frame
    pub(crate) fn require(&mut self, name: Symbol) -> EvalResult {
        let global = self.rt.global;
        if let Some(table) = self.rt.modules.get(&name).copied() {
            scope::define(&mut self.rt.heap, global, name, table);
            return Ok(table);
        }

        let module_name = self.rt.heap.symbol_name(name).to_string();
        let loaded = self.rt.loader.load(&module_name).map_err(Exception::from)?;

        let mark = self.temporaries.len();
        let table = self.allocate(|heap| heap.alloc_table())?;
        self.temporaries.push(table);
        let result = self.fill_module_table(table, &loaded.functions);
        self.temporaries.truncate(mark);
        result?;

        self.rt.modules.insert(name, table);
        scope::define(&mut self.rt.heap, global, name, table);
        Ok(table)
    }

    fn fill_module_table(
        &mut self,
        table: Value,
        functions: &[module_loader::LoadedFunction],
    ) -> Result<(), Exception> {
        let Value::Table(id) = table else {
            return Ok(());
        };
        for function in functions {
            let native = self.allocate(|heap| {
                heap.alloc_native(
                    &function.name,
                    function.arity,
                    Arc::clone(&function.entry),
                    None,
                )
            })?;
            let key = self.rt.heap.intern(&function.name);
            self.rt.heap.table_mut(id).entries.insert(key, native);
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr, env: HeapId) -> EvalResult {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.eval_inner(expr, env))
    }

    fn eval_inner(&mut self, expr: &Expr, env: HeapId) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(self.literal(literal)?),
            Expr::Symbol(symbol) => Ok(scope::lookup(&self.rt.heap, env, *symbol)?),
            Expr::Quote(datum) => self.quote(datum),
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.eval(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch, env)
                } else {
                    Ok(Value::Nil)
                }
            }
            Expr::Define { name, value } => {
                let value = self.eval(value, env)?;
                scope::define(&mut self.rt.heap, env, *name, value);
                Ok(value)
            }
            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                scope::assign(&mut self.rt.heap, env, *name, value)?;
                Ok(value)
            }
            Expr::Lambda(code) => {
                Ok(self.allocate(|heap| heap.alloc_function(Arc::clone(code), env))?)
            }
            Expr::Let { bindings, body } => {
                let frame = self.allocate(|heap| heap.alloc_frame(Some(env)))?;
                self.with_frame(frame, |ev| {
                    for (name, value) in bindings {
                        let value = ev.eval(value, frame)?;
                        scope::define(&mut ev.rt.heap, frame, *name, value);
                    }
                    ev.eval_sequence(body, frame)
                })
            }
            Expr::Block(body) => match self.eval_sequence(body, env) {
                Err(Signal::Return(value)) => Ok(value),
                other => other,
            },
            Expr::Return(value) => Err(Signal::Return(self.eval(value, env)?)),
            Expr::And(items) => {
                for item in items {
                    if !self.eval(item, env)?.is_truthy() {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
            Expr::Or(items) => {
                for item in items {
                    let value = self.eval(item, env)?;
                    if value.is_truthy() {
                        return Ok(value);
                    }
                }
                Ok(Value::Boolean(false))
            }
            Expr::Raise(payload) => {
                let payload = self.eval(payload, env)?;
                let message = display(&self.rt.heap, payload);
                Err(Exception::user(payload, message).into())
            }
            Expr::Try { body, handlers } => match self.eval(body, env) {
                Err(Signal::Raise(exception)) => {
                    match handlers.iter().find(|clause| clause.handles(exception.kind)) {
                        Some(clause) => {
                            let mark = self.temporaries.len();
                            let result =
                                self.handle(&exception, clause.binding, &clause.body, env);
                            self.temporaries.truncate(mark);
                            result
                        }
                        None => Err(Signal::Raise(exception)),
                    }
                }
                other => other,
            },
            Expr::Require(name) => self.require(*name),
            Expr::CurrentFrame => Ok(Value::Frame(env)),
            Expr::Call {
                operator,
                arguments,
            } => {
                let mark = self.temporaries.len();
                let result = self.eval_call(operator, arguments, env, mark);
                self.temporaries.truncate(mark);
                result
            }
        }
    }

    fn eval_sequence(&mut self, body: &[Expr], env: HeapId) -> EvalResult {
        let mut result = Value::Nil;
        for expr in body {
            result = self.eval(expr, env)?;
        }
        Ok(result)
    }

    fn eval_call(
        &mut self,
        operator: &Expr,
        arguments: &[Expr],
        env: HeapId,
        mark: usize,
    ) -> EvalResult {
        let callee = self.eval(operator, env)?;
        self.temporaries.push(callee);
        for argument in arguments {
            let value = self.eval(argument, env)?;
            self.temporaries.push(value);
        }
        let args = self.temporaries[mark + 1..].to_vec();
        self.apply(callee, &args)
    }

    fn apply(&mut self, callee: Value, args: &[Value]) -> EvalResult {
        match callee {
            Value::Function(id) => self.call_function(id, args),
            Value::NativeFunction(id) => self.call_native(id, args),
            other => Err(Exception::type_error(format!("cannot call a {}", other.tag())).into()),
        }
    }

    fn call_native(&mut self, id: HeapId, args: &[Value]) -> EvalResult {
        let native = self.rt.heap.native(id).clone();
        if !native.arity.accepts(args.len()) {
            return Err(Exception::arity(&native.name, native.arity, args.len()).into());
        }

        let result = match (native.entry)(&mut self.rt.heap, args) {
            Err(error) if error.kind == ErrorKind::OutOfMemory && native.restartable => {
                self.collect();
                (native.entry)(&mut self.rt.heap, args)
            }
            other => other,
        };
        result.map_err(|mut error| {
            error.stack.push(native.name.to_string());
            Signal::Raise(error)
        })
    }

    fn call_function(&mut self, id: HeapId, args: &[Value]) -> EvalResult {
        if self.depth >= self.rt.config.max_call_depth {
            return Err(Exception::out_of_memory("call depth limit exceeded").into());
        }
        self.safepoint();

        let (code, env) = {
            let function = self.rt.heap.function(id);
            (Arc::clone(&function.code), function.env)
        };

        if let Some(value) = self.try_compiled(id, &code, env, args) {
            return Ok(value);
        }

        if args.len() != code.params.len() {
            return Err(
                Exception::arity(&self.function_name(&code), code.params.len(), args.len()).into(),
            );
        }

        let frame = self.allocate(|heap| heap.alloc_frame(Some(env)))?;
        for (param, arg) in code.params.iter().zip(args) {
            scope::define(&mut self.rt.heap, frame, *param, *arg);
        }

        self.depth += 1;
        let result = self.with_frame(frame, |ev| ev.eval_sequence(&code.body, frame));
        self.depth -= 1;

        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Raise(mut error)) => {
                error.stack.push(self.function_name(&code));
                Err(Signal::Raise(error))
            }
        }
    }

    fn function_name(&self, code: &LambdaExpr) -> String {
        match code.name {
            Some(name) => self.rt.heap.symbol_name(name).to_string(),
            None => "lambda".to_string(),
        }
    }

    // ---- native code ----

    /// Run the compiled entry of function `id` if it exists and applies.
    ///
    /// Counts the call, asks the backend once the threshold is reached, and
    /// returns `None` whenever the interpreter must run instead: no code,
    /// non-integer arguments, or a primitive binding that changed.
    fn try_compiled(
        &mut self,
        id: HeapId,
        code: &LambdaExpr,
        env: HeapId,
        args: &[Value],
    ) -> Option<Value> {
        if !self.rt.config.jit_enabled || self.rt.backend.is_none() {
            return None;
        }

        let threshold = self.rt.config.jit_threshold;
        let (compiled, due) = {
            let profile = &mut self.rt.heap.function_mut(id).profile;
            profile.record_call();
            (profile.compiled_code().cloned(), profile.should_compile(threshold))
        };
        let compiled = match compiled {
            Some(compiled) => compiled,
            None if due => self.compile(id, code, env)?,
            None => return None,
        };

        if compiled.arity() != args.len() {
            return None;
        }
        let integers = args
            .iter()
            .map(Value::as_integer)
            .collect::<Option<Vec<i64>>>()?;
        if !self.guards_hold(compiled.as_ref(), env) {
            return None;
        }
        Some(compiled.invoke(&integers))
    }

    fn guards_hold(&self, compiled: &dyn CompiledCode, env: HeapId) -> bool {
        let heap = &self.rt.heap;
        compiled.guards().iter().all(|guard| {
            matches!(
                scope::resolve(heap, env, guard.symbol),
                Some(Value::NativeFunction(native))
                    if heap.native(native).primitive == Some(guard.primitive)
            )
        })
    }

    fn compile(
        &mut self,
        id: HeapId,
        code: &LambdaExpr,
        env: HeapId,
    ) -> Option<Arc<dyn CompiledCode>> {
        let primitives = self.free_primitives(code, env);
        let name = self.function_name(code);
        let backend = self.rt.backend.as_mut()?;
        let request = CompileRequest {
            code,
            primitives: &primitives,
        };

        match backend.compile(&request) {
            Ok(compiled) => {
                tracing::debug!(function = %name, backend = backend.name(), "compiled function");
                self.rt.heap.function_mut(id).profile.compiled =
                    CompiledState::Ready(Arc::clone(&compiled));
                Some(compiled)
            }
            Err(reason) => {
                tracing::debug!(function = %name, %reason, "staying interpreted");
                self.rt.heap.function_mut(id).profile.compiled = CompiledState::Failed;
                None
            }
        }
    }

    /// Free symbols of `code` that resolve to primitives from `env`
    fn free_primitives(&self, code: &LambdaExpr, env: HeapId) -> FxHashMap<Symbol, Primitive> {
        let mut symbols = FxHashSet::default();
        for expr in &code.body {
            collect_symbols(expr, &mut symbols);
        }

        let heap = &self.rt.heap;
        symbols
            .into_iter()
            .filter(|symbol| !code.params.contains(symbol))
            .filter_map(|symbol| match scope::resolve(heap, env, symbol) {
                Some(Value::NativeFunction(native)) => {
                    heap.native(native).primitive.map(|primitive| (symbol, primitive))
                }
                _ => None,
            })
            .collect()
    }

    // ---- data ----

    fn literal(&mut self, literal: &Literal) -> Result<Value, Exception> {
        match literal {
            Literal::Nil => Ok(Value::Nil),
            Literal::Boolean(b) => Ok(Value::Boolean(*b)),
            Literal::Integer(n) => Ok(Value::Integer(*n)),
            Literal::Real(n) => Ok(Value::Real(*n)),
            Literal::String(text) => {
                self.allocate(|heap| heap.alloc_shared_string(Arc::clone(text)))
            }
        }
    }

    fn quote(&mut self, datum: &Datum) -> EvalResult {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || match datum {
            Datum::Literal(literal) => Ok(self.literal(literal)?),
            Datum::Symbol(symbol) => Ok(Value::Symbol(*symbol)),
            Datum::List(items) => {
                let mark = self.temporaries.len();
                let result = self.quote_list(items, mark);
                self.temporaries.truncate(mark);
                result
            }
        })
    }

    /// Build a fresh list, keeping every element and the partial chain rooted
    fn quote_list(&mut self, items: &[Datum], mark: usize) -> EvalResult {
        for item in items {
            let value = self.quote(item)?;
            self.temporaries.push(value);
        }

        let accumulator = self.temporaries.len();
        self.temporaries.push(Value::Nil);
        for index in (0..items.len()).rev() {
            let head = self.temporaries[mark + index];
            let tail = self.temporaries[accumulator];
            let cell = self.allocate(|heap| heap.alloc_cell(head, tail))?;
            self.temporaries[accumulator] = cell;
        }
        Ok(self.temporaries[accumulator])
    }

    /// Bind the error table of `exception` and run a catch body
    fn handle(
        &mut self,
        exception: &Exception,
        binding: Symbol,
        body: &[Expr],
        env: HeapId,
    ) -> EvalResult {
        self.temporaries.push(exception.payload);
        let message = self.allocate(|heap| heap.alloc_string(&exception.message))?;
        self.temporaries.push(message);

        let heap = &mut self.rt.heap;
        let kind = Value::Symbol(heap.intern(exception.kind.name()));
        let entries = [
            (heap.intern("kind"), kind),
            (heap.intern("message"), message),
            (heap.intern("payload"), exception.payload),
        ];
        let table = self.allocate(|heap| heap.alloc_table_from(entries))?;
        self.temporaries.push(table);

        let frame = self.allocate(|heap| heap.alloc_frame(Some(env)))?;
        scope::define(&mut self.rt.heap, frame, binding, table);
        self.with_frame(frame, |ev| ev.eval_sequence(body, frame))
    }

    // ---- memory ----

    fn with_frame<R>(&mut self, frame: HeapId, f: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Allocate through `f`, collecting and retrying once on exhaustion
    fn allocate<T>(
        &mut self,
        f: impl Fn(&mut Heap) -> Result<T, OutOfMemory>,
    ) -> Result<T, Exception> {
        match f(&mut self.rt.heap) {
            Ok(value) => Ok(value),
            Err(_) => {
                self.collect();
                Ok(f(&mut self.rt.heap)?)
            }
        }
    }

    fn safepoint(&mut self) {
        if self.rt.heap.should_collect() {
            self.collect();
        }
    }

    fn collect(&mut self) -> CollectionReport {
        let mut roots: Vec<Value> = self.rt.roots().collect();
        roots.extend(self.frames.iter().map(|frame| Value::Frame(*frame)));
        roots.extend_from_slice(&self.temporaries);
        self.rt.heap.collect(roots)
    }
}

/// Every symbol an expression mentions, including under lambdas
fn collect_symbols(expr: &Expr, out: &mut FxHashSet<Symbol>) {
    let mut pending = vec![expr];
    while let Some(expr) = pending.pop() {
        match expr {
            Expr::Symbol(symbol) => {
                out.insert(*symbol);
            }
            _ => expr.for_each_child(|child| pending.push(child)),
        }
    }
}
