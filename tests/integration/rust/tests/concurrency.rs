//! Shared runtime integration tests
//!
//! Several threads drive one runtime through `SharedRuntime`; each
//! evaluation runs to completion before the next starts.

use std::thread;

use core_types::Value;
use integration_tests::runtime;
use interpreter::{RuntimeConfig, SharedRuntime};

#[test]
fn test_threads_share_globals() {
    let shared = SharedRuntime::new(runtime(
        RuntimeConfig::default()
            .with_jit_enabled(false)
            .with_gc_threshold(32),
    ));
    shared
        .eval_str("(define log nil) (define (note x) (set! log (cons x log)))")
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let source = format!("(note (list {} {}))", worker, i);
                    shared.eval_str(&source).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(shared.eval_str("(length log)").unwrap(), Value::Integer(200));
    assert!(shared.with(|rt| rt.gc_stats().collections) > 0);
}

#[test]
fn test_errors_stay_in_their_thread() {
    let shared = SharedRuntime::new(runtime(RuntimeConfig::default().with_jit_enabled(false)));
    shared.eval_str("(define counter 0)").unwrap();

    let failing = {
        let shared = shared.clone();
        thread::spawn(move || shared.eval_str("(block (set! counter 1) (raise 'boom))").is_err())
    };
    assert!(failing.join().unwrap());
    assert_eq!(shared.eval_str("counter").unwrap(), Value::Integer(1));
}
