//! Full pipeline integration tests
//!
//! Source text flows through the parser crate into the interpreter and the
//! printer of the memory manager.

use core_types::{ErrorKind, Value};
use integration_tests::{eval_display, interpreted};

/// Test: the parser crate and the runtime agree on symbols
#[test]
fn test_parser_output_evaluates() {
    let mut rt = interpreted();
    let program =
        parser::parse_program("(define x 20) (+ x 22)", rt.heap_mut().symbols_mut()).unwrap();
    assert_eq!(rt.evaluate_all(&program).unwrap(), Value::Integer(42));
}

/// Test: free variables resolve through the defining frame, not the caller's
#[test]
fn test_lexical_scoping_across_frames() {
    let mut rt = interpreted();
    rt.eval_str(
        "(define x 'global)
         (define (make) (let ((x 'captured)) (lambda () x)))
         (define get-x (make))
         (define (caller) (let ((x 'caller)) (get-x)))",
    )
    .unwrap();
    assert_eq!(eval_display(&mut rt, "(caller)"), "captured");
}

/// Test: shadowing inside a nested frame leaves the outer binding alone
#[test]
fn test_shadowing_does_not_leak() {
    let mut rt = interpreted();
    rt.eval_str("(define v 1) (define (shadow v) (set! v 99) v)")
        .unwrap();
    assert_eq!(rt.eval_str("(shadow 5)").unwrap(), Value::Integer(99));
    assert_eq!(rt.eval_str("v").unwrap(), Value::Integer(1));
    assert_eq!(
        rt.eval_str("(let ((v 2)) (set! v 3) v)").unwrap(),
        Value::Integer(3)
    );
    assert_eq!(rt.eval_str("v").unwrap(), Value::Integer(1));
}

/// Test: two closures over one frame observe each other's assignments
#[test]
fn test_closure_mutation_visible_to_sibling() {
    let mut rt = interpreted();
    rt.eval_str(
        "(define (make-account)
           (let ((balance 0))
             (list (lambda (n) (set! balance (+ balance n)))
                   (lambda () balance))))
         (define account (make-account))
         (define deposit (head account))
         (define balance (head (tail account)))",
    )
    .unwrap();
    rt.eval_str("(deposit 30) (deposit 12)").unwrap();
    assert_eq!(rt.eval_str("(balance)").unwrap(), Value::Integer(42));
}

/// Test: f(5) follows the captured global through set!
#[test]
fn test_closure_over_mutable_global() {
    let mut rt = interpreted();
    rt.eval_str("(define y 1) (define (f x) (+ x y))").unwrap();
    assert_eq!(rt.eval_str("(f 5)").unwrap(), Value::Integer(6));
    rt.eval_str("(set! y 10)").unwrap();
    assert_eq!(rt.eval_str("(f 5)").unwrap(), Value::Integer(15));
}

/// Test: tables compare structurally but not by identity
#[test]
fn test_table_equality() {
    let mut rt = interpreted();
    rt.eval_str(
        "(define a (table 'x 1 'y (list 1 2)))
         (define b (table 'x 1 'y (list 1 2)))",
    )
    .unwrap();
    assert_eq!(rt.eval_str("(equal? a b)").unwrap(), Value::Boolean(true));
    assert_eq!(rt.eval_str("(eq? a b)").unwrap(), Value::Boolean(false));
    assert_eq!(rt.eval_str("(eq? a a)").unwrap(), Value::Boolean(true));
}

/// Test: mutually cyclic structures compare without looping
#[test]
fn test_mutually_cyclic_equality() {
    let mut rt = interpreted();
    rt.eval_str(
        "(define a1 (table 'name 1)) (define b1 (table 'name 2))
         (put! a1 'peer b1) (put! b1 'peer a1)
         (define a2 (table 'name 1)) (define b2 (table 'name 2))
         (put! a2 'peer b2) (put! b2 'peer a2)",
    )
    .unwrap();
    assert_eq!(rt.eval_str("(equal? a1 a2)").unwrap(), Value::Boolean(true));
    assert_eq!(rt.eval_str("(equal? a1 b2)").unwrap(), Value::Boolean(false));
}

/// Test: wrong argument counts fail before any binding is made
#[test]
fn test_arity_leaves_frames_untouched() {
    let mut rt = interpreted();
    rt.eval_str("(define a 'outer) (define (pair a b) (list a b))")
        .unwrap();
    for call in ["(pair 1)", "(pair 1 2 3)"] {
        let error = rt.eval_str(call).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::ArityError), "{}", call);
    }
    assert_eq!(eval_display(&mut rt, "a"), "outer");
    assert_eq!(eval_display(&mut rt, "(pair 1 2)"), "(1 2)");
}

/// Test: every recoverable kind is caught by a matching handler
#[test]
fn test_recoverable_errors_are_interceptable() {
    let mut rt = interpreted();
    let cases = [
        ("missing", "UnboundVariable"),
        ("((lambda (x) x))", "ArityError"),
        ("(+ 1 \"a\")", "TypeError"),
        ("(require no_such_module)", "ModuleLoadError"),
        ("(raise 'oops)", "UserRaised"),
    ];
    for (body, kind) in cases {
        let source = format!("(try {} (catch e (get e 'kind)))", body);
        assert_eq!(eval_display(&mut rt, &source), kind, "{}", body);
    }
}

/// Test: the runtime printer renders every tag
#[test]
fn test_printer_over_pipeline() {
    let mut rt = interpreted();
    assert_eq!(eval_display(&mut rt, "'(1 (2.5 \"s\") sym)"), "(1 (2.5 s) sym)");
    assert_eq!(eval_display(&mut rt, "(cons 1 2)"), "(1 . 2)");
    assert_eq!(eval_display(&mut rt, "(define (sq x) (* x x))"), "#<function sq>");
    assert_eq!(eval_display(&mut rt, "+"), "#<native-function +>");
    assert_eq!(eval_display(&mut rt, "(not nil)"), "true");
}
