//! Integration tests for interpreter
//!
//! Tests interaction between the evaluator, the collector, native modules
//! and a compilation backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_types::{CompiledCode, ErrorKind, Exception, Primitive, PrimitiveGuard, Value};
use interpreter::{BackendError, CompileRequest, CompilerBackend, Runtime, RuntimeConfig};
use memory_manager::{Arity, Heap};
use module_loader::{ModuleRegistrar, NativeModule};

// ============================================================================
// Collection under pressure
// ============================================================================

const CHURN: &str = "
    (define (churn n)
      (if (= n 0)
          'done
          (block (list 1 2 3 4) (churn (- n 1)))))
    (define (repeat k)
      (if (= k 0)
          'done
          (block (churn 20) (repeat (- k 1)))))";

fn small_heap() -> Runtime {
    let config = RuntimeConfig::default()
        .with_gc_threshold(64)
        .with_max_objects(Some(400));
    Runtime::new(config).unwrap()
}

#[test]
fn test_garbage_is_reclaimed_mid_evaluation() {
    let mut rt = small_heap();
    rt.eval_str(CHURN).unwrap();
    let result = rt.eval_str("(repeat 50)").unwrap();
    assert_eq!(rt.display(result), "done");

    let stats = rt.gc_stats();
    assert!(stats.collections > 0);
    assert!(stats.total_freed > 0);
    assert!(stats.live_objects <= 400);
}

#[test]
fn test_reachable_data_survives_collection() {
    let mut rt = small_heap();
    rt.eval_str(CHURN).unwrap();
    rt.eval_str("(define keep (list 'a (table 'k \"v\") 3.5))").unwrap();
    rt.eval_str("(repeat 30)").unwrap();

    assert!(rt.gc_stats().collections > 0);
    let kept = rt.global("keep").unwrap();
    assert_eq!(rt.display(kept), "(a {k: v} 3.5)");
}

#[test]
fn test_closures_survive_collection() {
    let mut rt = small_heap();
    rt.eval_str(CHURN).unwrap();
    rt.eval_str(
        "(define (make-adder n) (lambda (x) (+ x n)))
         (define add5 (make-adder 5))",
    )
    .unwrap();
    rt.eval_str("(repeat 30)").unwrap();
    assert_eq!(rt.eval_str("(add5 10)").unwrap(), Value::Integer(15));
}

#[test]
fn test_live_set_over_limit_is_out_of_memory() {
    let mut rt = small_heap();
    rt.eval_str("(define (build n acc) (if (= n 0) acc (build (- n 1) (cons n acc))))")
        .unwrap();

    let error = rt.eval_str("(build 1000 nil)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::OutOfMemory));

    // The failed evaluation's data is garbage now.
    assert_eq!(rt.eval_str("(length (build 10 nil))").unwrap(), Value::Integer(10));
}

#[test]
fn test_out_of_memory_not_catchable() {
    let mut rt = small_heap();
    rt.eval_str("(define (build n acc) (if (= n 0) acc (build (- n 1) (cons n acc))))")
        .unwrap();
    let error = rt
        .eval_str("(try (build 1000 nil) (catch e 'caught))")
        .unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::OutOfMemory));
}

#[test]
fn test_host_native_out_of_memory_runs_once() {
    let mut rt = small_heap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    rt.define_native(
        "exhaust",
        Arity::exact(0),
        Arc::new(move |_: &mut Heap, _: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Exception::out_of_memory("host buffer full"))
        }),
    )
    .unwrap();

    let error = rt.eval_str("(exhaust)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::OutOfMemory));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_collection_between_evaluations() {
    let config = RuntimeConfig::default().with_gc_threshold(32);
    let mut rt = Runtime::new(config).unwrap();
    let baseline = rt.gc_stats().live_objects;

    for _ in 0..100 {
        rt.eval_str("(list 1 2 3 4 5 6 7 8)").unwrap();
    }
    // Without boundary collections this would be baseline + 800.
    assert!(rt.gc_stats().live_objects < baseline + 200);
    assert!(rt.gc_stats().collections > 0);
}

#[test]
fn test_no_collection_between_evaluations_when_disabled() {
    let config = RuntimeConfig::default()
        .with_gc_threshold(32)
        .with_collect_between_evaluations(false);
    let mut rt = Runtime::new(config).unwrap();

    for _ in 0..20 {
        rt.eval_str("(list 1 2 3 4 5 6 7 8)").unwrap();
    }
    // No calls to interpreted functions means no safepoints.
    assert_eq!(rt.gc_stats().collections, 0);
}

#[test]
fn test_cycles_are_reclaimed() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    rt.eval_str(
        "(define a (list 1 2))
         (set-tail! (tail a) a)
         (define t (table))
         (put! t 'self t)",
    )
    .unwrap();
    let before = rt.collect().live_objects;

    rt.eval_str("(set! a nil) (set! t nil)").unwrap();
    let after = rt.collect().live_objects;
    assert_eq!(before - after, 3);
}

// ============================================================================
// Native modules
// ============================================================================

struct Doubler;

fn double(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    match args[0] {
        Value::Integer(n) => Ok(Value::Integer(n * 2)),
        other => Err(Exception::type_error(format!(
            "double expects an integer, got {}",
            other.tag()
        ))),
    }
}

fn greet(heap: &mut Heap, _: &[Value]) -> Result<Value, Exception> {
    Ok(heap.alloc_string("hello")?)
}

impl NativeModule for Doubler {
    fn name(&self) -> &str {
        "doubler"
    }

    fn register(&self, registrar: &mut ModuleRegistrar) {
        registrar
            .function("double", Arity::exact(1), double)
            .function("greet", Arity::exact(0), greet);
    }
}

fn with_doubler() -> Runtime {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    rt.register_module(Arc::new(Doubler));
    rt
}

#[test]
fn test_require_binds_module_table() {
    let mut rt = with_doubler();
    let result = rt
        .eval_str("(require doubler) ((get doubler 'double) 21)")
        .unwrap();
    assert_eq!(result, Value::Integer(42));

    let greeting = rt.eval_str("((get doubler 'greet))").unwrap();
    assert_eq!(rt.display(greeting), "hello");
}

#[test]
fn test_require_is_idempotent() {
    let mut rt = with_doubler();
    assert_eq!(
        rt.eval_str("(eq? (require doubler) (require doubler))").unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_module_arity_and_errors() {
    let mut rt = with_doubler();
    rt.eval_str("(require doubler)").unwrap();
    let error = rt.eval_str("((get doubler 'double) 1 2)").unwrap_err();
    assert_eq!(error.to_string(), "ArityError: double expects 1 argument(s), got 2");

    let error = rt.eval_str("((get doubler 'double) 'x)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::TypeError));
}

#[test]
fn test_missing_module_is_catchable() {
    let mut rt = with_doubler();
    let result = rt
        .eval_str("(try (require nowhere) (catch (ModuleLoadError) e 'missing))")
        .unwrap();
    assert_eq!(rt.display(result), "missing");
}

#[test]
fn test_install_module_from_host() {
    let mut rt = with_doubler();
    let table = rt.install_module("doubler").unwrap();
    assert_eq!(rt.global("doubler"), Some(table));
    rt.collect();
    assert_eq!(
        rt.eval_str("((get doubler 'double) 4)").unwrap(),
        Value::Integer(8)
    );
}

#[test]
fn test_module_table_survives_rebinding() {
    let mut rt = with_doubler();
    rt.eval_str("(require doubler) (define d (get doubler 'double)) (set! doubler nil)")
        .unwrap();
    rt.collect();
    assert_eq!(
        rt.eval_str("(eq? (require doubler) (require doubler))").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(rt.eval_str("(d 3)").unwrap(), Value::Integer(6));
}

// ============================================================================
// Compilation backend
// ============================================================================

/// Compiles only `(lambda (p) (+ p 1))`
struct IncrementBackend {
    compiles: Arc<AtomicUsize>,
    invocations: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct Increment {
    guards: Vec<PrimitiveGuard>,
    invocations: Arc<AtomicUsize>,
}

impl CompiledCode for Increment {
    fn arity(&self) -> usize {
        1
    }

    fn guards(&self) -> &[PrimitiveGuard] {
        &self.guards
    }

    fn invoke(&self, args: &[i64]) -> Value {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Value::Integer(args[0].wrapping_add(1))
    }
}

impl CompilerBackend for IncrementBackend {
    fn name(&self) -> &str {
        "increment"
    }

    fn compile(
        &mut self,
        request: &CompileRequest<'_>,
    ) -> Result<Arc<dyn CompiledCode>, BackendError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let plus = request
            .primitives
            .iter()
            .find(|(_, primitive)| **primitive == Primitive::Add)
            .map(|(symbol, _)| *symbol)
            .ok_or_else(|| BackendError::Unsupported("no addition".to_string()))?;
        if request.code.params.len() != 1 {
            return Err(BackendError::Unsupported("arity".to_string()));
        }
        Ok(Arc::new(Increment {
            guards: vec![PrimitiveGuard {
                symbol: plus,
                primitive: Primitive::Add,
            }],
            invocations: Arc::clone(&self.invocations),
        }))
    }
}

fn with_backend(threshold: u64) -> (Runtime, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let config = RuntimeConfig::default().with_jit_threshold(threshold);
    let mut rt = Runtime::new(config).unwrap();
    let compiles = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));
    rt.set_backend(Box::new(IncrementBackend {
        compiles: Arc::clone(&compiles),
        invocations: Arc::clone(&invocations),
    }));
    (rt, compiles, invocations)
}

#[test]
fn test_hot_function_runs_compiled() {
    let (mut rt, compiles, invocations) = with_backend(3);
    rt.eval_str("(define (inc n) (+ n 1))").unwrap();
    for _ in 0..10 {
        assert_eq!(rt.eval_str("(inc 5)").unwrap(), Value::Integer(6));
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
    assert_eq!(invocations.load(Ordering::SeqCst), 8);
}

#[test]
fn test_cold_function_stays_interpreted() {
    let (mut rt, compiles, _) = with_backend(100);
    rt.eval_str("(define (inc n) (+ n 1)) (inc 1) (inc 2)").unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_integer_arguments_fall_back() {
    let (mut rt, _, invocations) = with_backend(1);
    rt.eval_str("(define (inc n) (+ n 1)) (inc 1)").unwrap();
    assert_eq!(rt.eval_str("(inc 1.5)").unwrap(), Value::Real(2.5));
    let error = rt.eval_str("(inc 'x)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::TypeError));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wrong_arity_raises_like_interpreter() {
    let (mut rt, _, _) = with_backend(1);
    rt.eval_str("(define (inc n) (+ n 1)) (inc 1)").unwrap();
    let error = rt.eval_str("(inc 1 2)").unwrap_err();
    assert_eq!(error.to_string(), "ArityError: inc expects 1 argument(s), got 2");
}

#[test]
fn test_rebound_primitive_invalidates_guard() {
    let (mut rt, _, invocations) = with_backend(1);
    rt.eval_str("(define (inc n) (+ n 1)) (inc 1)").unwrap();
    rt.eval_str("(define + -)").unwrap();
    assert_eq!(rt.eval_str("(inc 5)").unwrap(), Value::Integer(4));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_declined_compilation_not_retried() {
    let (mut rt, compiles, invocations) = with_backend(1);
    rt.eval_str("(define (pair a b) (list a b))").unwrap();
    for _ in 0..5 {
        rt.eval_str("(pair 1 2)").unwrap();
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_disabled_jit_never_compiles() {
    let config = RuntimeConfig::default()
        .with_jit_threshold(1)
        .with_jit_enabled(false);
    let mut rt = Runtime::new(config).unwrap();
    let compiles = Arc::new(AtomicUsize::new(0));
    rt.set_backend(Box::new(IncrementBackend {
        compiles: Arc::clone(&compiles),
        invocations: Arc::new(AtomicUsize::new(0)),
    }));
    rt.eval_str("(define (inc n) (+ n 1)) (inc 1) (inc 2) (inc 3)").unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 0);
}
