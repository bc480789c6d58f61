//! Interpreter and native backend integration tests
//!
//! The same programs run with compilation forced on and off must agree.

use core_types::Value;
use integration_tests::{interpreted, runtime};
use interpreter::{Runtime, RuntimeConfig};
use jit_compiler::CraneliftBackend;

fn compiling() -> Runtime {
    let mut rt = runtime(RuntimeConfig::default().with_jit_threshold(2));
    rt.set_backend(Box::new(CraneliftBackend::new().unwrap()));
    rt
}

const LIBRARY: &str = "
    (define (clamp lo x hi) (if (< x lo) lo (if (> x hi) hi x)))
    (define (mix a b) (+ (* 3 a) (- b) 1))
    (define (odd-ish n) (not (= (% n 2) 0)))
    (define (sum-to n acc) (if (= n 0) acc (sum-to (- n 1) (+ acc n))))";

#[test]
fn test_results_match_with_and_without_backend() {
    let mut compiled = compiling();
    let mut plain = interpreted();
    compiled.eval_str(LIBRARY).unwrap();
    plain.eval_str(LIBRARY).unwrap();

    let calls = [
        "(clamp 0 -5 10)",
        "(clamp 0 5 10)",
        "(clamp 0 50 10)",
        "(mix 7 2)",
        "(mix -9223372036854775807 0)",
        "(odd-ish 7)",
        "(sum-to 200 0)",
        "(clamp 0 2.5 10)",
        "(mix 'a 1)",
        "(clamp 1 2)",
    ];
    for _ in 0..4 {
        for call in calls {
            let left = compiled.eval_str(call).map(|v| compiled.display(v));
            let right = plain.eval_str(call).map(|v| plain.display(v));
            match (left, right) {
                (Ok(a), Ok(b)) => assert_eq!(a, b, "{}", call),
                (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind(), "{}", call),
                (a, b) => panic!("{} diverged: {:?} vs {:?}", call, a, b),
            }
        }
    }
}

#[test]
fn test_compiled_closure_sees_assignments() {
    let mut rt = compiling();
    rt.eval_str("(define y 1) (define (f x) (+ x y))").unwrap();
    for _ in 0..3 {
        assert_eq!(rt.eval_str("(f 5)").unwrap(), Value::Integer(6));
    }
    rt.eval_str("(set! y 10)").unwrap();
    for _ in 0..3 {
        assert_eq!(rt.eval_str("(f 5)").unwrap(), Value::Integer(15));
    }
}

#[test]
fn test_redefining_primitive_after_warmup() {
    let mut rt = compiling();
    rt.eval_str("(define (twice n) (* n 2))").unwrap();
    for _ in 0..3 {
        assert_eq!(rt.eval_str("(twice 21)").unwrap(), Value::Integer(42));
    }
    rt.eval_str("(define * +)").unwrap();
    assert_eq!(rt.eval_str("(twice 21)").unwrap(), Value::Integer(23));
}

#[test]
fn test_collections_during_compiled_calls() {
    let mut rt = runtime(
        RuntimeConfig::default()
            .with_jit_threshold(1)
            .with_gc_threshold(16),
    );
    rt.set_backend(Box::new(CraneliftBackend::new().unwrap()));
    rt.eval_str(
        "(define (inc n) (+ n 1))
         (define (walk n acc) (if (= n 0) acc (walk (- n 1) (cons (inc n) acc))))",
    )
    .unwrap();
    assert_eq!(
        rt.eval_str("(length (walk 300 nil))").unwrap(),
        Value::Integer(300)
    );
    assert!(rt.gc_stats().collections > 0);
}
