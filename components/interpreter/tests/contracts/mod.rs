//! Contract tests for interpreter API
//!
//! These tests verify the public embedding API behaves as documented.

use std::sync::Arc;

use core_types::{ErrorKind, Exception, Value};
use interpreter::{prelude, KaiError, Runtime, RuntimeConfig, SharedRuntime};
use memory_manager::{Arity, Heap};

/// Test Runtime::new() installs the prelude in the global frame
#[test]
fn test_runtime_new_contract() {
    let rt = Runtime::new(RuntimeConfig::default()).unwrap();
    assert_eq!(prelude::names().count(), 32);
    assert!(rt.global("cons").is_some());
    assert!(rt.global("nonexistent").is_none());
    assert!(!rt.has_backend());
}

/// Test Runtime::parse() then evaluate() matches eval_str()
#[test]
fn test_parse_then_evaluate_contract() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let program = rt.parse("(define n 4) (* n n)").unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(rt.evaluate_all(&program).unwrap(), Value::Integer(16));
    assert_eq!(rt.evaluate(&program[1]).unwrap(), Value::Integer(16));
}

/// Test errors keep their kind across the host boundary
#[test]
fn test_error_kind_contract() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let cases = [
        ("missing", ErrorKind::UnboundVariable),
        ("((lambda (x) x))", ErrorKind::ArityError),
        ("(+ 1 'a)", ErrorKind::TypeError),
        ("(require absent)", ErrorKind::ModuleLoadError),
        ("(raise 1)", ErrorKind::UserRaised),
    ];
    for (source, kind) in cases {
        let error = rt.eval_str(source).unwrap_err();
        assert_eq!(error.kind(), Some(kind), "{}", source);
    }
}

/// Test a runtime stays usable after any error
#[test]
fn test_runtime_reusable_after_error_contract() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    assert!(rt.eval_str("(define x 1) (head x)").is_err());
    assert!(matches!(rt.eval_str("(("), Err(KaiError::Parse(_))));
    assert_eq!(rt.eval_str("x").unwrap(), Value::Integer(1));
}

/// Test host natives receive the heap and report errors
#[test]
fn test_define_native_contract() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    rt.define_native(
        "shout",
        Arity::exact(1),
        Arc::new(|heap: &mut Heap, args: &[Value]| match args[0] {
            Value::String(id) => {
                let loud = heap.string(id).to_uppercase();
                Ok(heap.alloc_string(&loud)?)
            }
            other => Err(Exception::type_error(format!("shout got {}", other.tag()))),
        }),
    )
    .unwrap();

    let value = rt.eval_str("(shout \"kai\")").unwrap();
    assert_eq!(rt.display(value), "KAI");
    assert_eq!(
        rt.eval_str("(shout 1)").unwrap_err().kind(),
        Some(ErrorKind::TypeError)
    );
}

/// Test structural equality is exposed to hosts
#[test]
fn test_structurally_equal_contract() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let a = rt.eval_str("(list 1 \"two\" 'three)").unwrap();
    rt.pin(a);
    let b = rt.eval_str("(list 1 \"two\" 'three)").unwrap();
    assert!(rt.structurally_equal(a, b));
    assert_ne!(a, b);
}

/// Test configuration from JSON reaches the heap
#[test]
fn test_config_contract() {
    let config = RuntimeConfig::from_json_str(r#"{ "gc_threshold": 10, "max_objects": 500 }"#)
        .unwrap();
    let rt = Runtime::new(config).unwrap();
    assert_eq!(rt.heap().config().gc_threshold, 10);
    assert_eq!(rt.heap().config().max_objects, Some(500));
    assert_eq!(rt.config().max_call_depth, 10_000);
}

/// Test SharedRuntime serializes access from several threads
#[test]
fn test_shared_runtime_contract() {
    let shared = SharedRuntime::new(Runtime::new(RuntimeConfig::default()).unwrap());
    let writer = shared.clone();
    std::thread::spawn(move || {
        writer.eval_str("(define (sq x) (* x x))").unwrap();
    })
    .join()
    .unwrap();

    let value = shared.with(|rt| rt.eval_str("(sq 9)")).unwrap();
    assert_eq!(value, Value::Integer(81));
    assert_eq!(shared.lock().global("sq").map(|v| v.is_callable()), Some(true));
}
