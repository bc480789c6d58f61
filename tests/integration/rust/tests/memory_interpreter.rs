//! Memory Manager and Interpreter Integration Tests
//!
//! The collector runs underneath live evaluations and must neither leak
//! cycles nor reclaim anything an active call can still reach.

use core_types::{ErrorKind, Value};
use integration_tests::runtime;
use interpreter::RuntimeConfig;

fn tight(threshold: usize) -> RuntimeConfig {
    RuntimeConfig::default()
        .with_jit_enabled(false)
        .with_gc_threshold(threshold)
}

/// Test: a self-referential cell is reclaimed once unreachable
#[test]
fn test_self_referential_cell_reclaimed() {
    let mut rt = runtime(tight(10_000));
    rt.collect();
    let baseline = rt.gc_stats().live_objects;

    rt.eval_str("(define c (cons 1 nil)) (set-tail! c c)").unwrap();
    rt.collect();
    assert_eq!(rt.gc_stats().live_objects, baseline + 1);

    rt.eval_str("(set! c nil)").unwrap();
    let stats = rt.collect();
    assert_eq!(stats.last_freed, 1);
    assert_eq!(stats.live_objects, baseline);
}

/// Test: values held only by an in-progress call survive collections
#[test]
fn test_live_frames_survive_collection() {
    let mut rt = runtime(tight(8));
    let source = "
        (define (build n acc)
          (if (= n 0)
              acc
              (build (- n 1) (cons (list n n) acc))))
        (define (garbage n) (if (= n 0) nil (block (list 1 2 3 4) (garbage (- n 1)))))
        (define (check)
          (let ((kept (build 50 nil)))
            (garbage 300)
            (length kept)))
        (check)";
    assert_eq!(rt.eval_str(source).unwrap(), Value::Integer(50));
    assert!(rt.gc_stats().collections > 0);
}

/// Test: pinned host values outlive explicit collections
#[test]
fn test_pinned_values_survive() {
    let mut rt = runtime(tight(10_000));
    let value = rt.eval_str("(list 'a 'b 'c)").unwrap();
    rt.pin(value);
    rt.collect();
    assert_eq!(rt.display(value), "(a b c)");
    assert!(rt.unpin(value));
    assert!(!rt.unpin(value));
}

/// Test: a hard object limit surfaces as uncatchable OutOfMemory
#[test]
fn test_heap_limit_is_out_of_memory() {
    let mut rt = runtime(tight(32).with_max_objects(Some(300)));
    rt.eval_str("(define (hoard n acc) (if (= n 0) acc (hoard (- n 1) (cons n acc))))")
        .unwrap();

    let error = rt
        .eval_str("(try (define kept (hoard 1000 nil)) (catch e 'caught))")
        .unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::OutOfMemory));

    // Nothing stays reachable from the failed evaluation.
    rt.collect();
    assert_eq!(rt.eval_str("(length (hoard 10 nil))").unwrap(), Value::Integer(10));
}

/// Test: statistics accumulate across collections
#[test]
fn test_stats_accumulate() {
    let mut rt = runtime(tight(16));
    rt.eval_str("(define (churn n) (if (= n 0) 'done (block (cons n n) (churn (- n 1)))))")
        .unwrap();
    rt.eval_str("(churn 500)").unwrap();
    let stats = rt.gc_stats();
    assert!(stats.collections > 0);
    assert!(stats.total_freed > 0);
    assert!(stats.total_allocated >= stats.total_freed + stats.live_objects as u64);
}
