//! End-to-End CLI Integration Tests
//!
//! Tests the complete runtime through the kai_cli Session API. This is the
//! highest level integration test: program file to printed result.

use std::io::Write;

use clap::Parser as ClapParser;
use core_types::Value;
use kai_cli::{Cli, CliError, Session};
use tempfile::NamedTempFile;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("kai").chain(args.iter().copied())).unwrap()
}

fn program(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

/// Test: a program file with closures and tables
#[test]
fn test_e2e_program_file() {
    let file = program(
        "(define (make-point x y) (table 'x x 'y y))
         (define (dist2 p) (+ (* (get p 'x) (get p 'x)) (* (get p 'y) (get p 'y))))
         (dist2 (make-point 3 4))",
    );
    let path = file.path().to_str().unwrap();
    let mut session = Session::from_cli(&parse(&["--no-jit", "-f", path])).unwrap();
    let value = session.execute_file(file.path()).unwrap();
    assert_eq!(session.render(value).as_deref(), Some("25"));
}

/// Test: the closure-over-global scenario through the CLI surface
#[test]
fn test_e2e_closure_scenario() {
    let mut session = Session::from_cli(&parse(&[])).unwrap();
    let value = session
        .execute_string(
            "(define y 1)
             (define (f x) (+ x y))
             (define first (f 5))
             (set! y 10)
             (list first (f 5))",
        )
        .unwrap();
    assert_eq!(session.render(value).as_deref(), Some("(6 15)"));
}

/// Test: bundled modules are available without a search path
#[test]
fn test_e2e_bundled_module() {
    let mut session = Session::from_cli(&parse(&["--no-jit"])).unwrap();
    let value = session
        .execute_string("(require kai_math) ((get kai_math 'abs) -9)")
        .unwrap();
    assert_eq!(value, Value::Integer(9));
}

/// Test: an uncaught raise prints as Kind: message
#[test]
fn test_e2e_uncaught_error() {
    let mut session = Session::from_cli(&parse(&["--no-jit"])).unwrap();
    let error = session.execute_string("(raise \"boom\")").unwrap_err();
    assert!(matches!(error, CliError::Kai(_)));
    assert!(error.to_string().starts_with("UserRaised: "));
}

/// Test: nil results print nothing
#[test]
fn test_e2e_nil_prints_nothing() {
    let mut session = Session::from_cli(&parse(&["--gc-stats"])).unwrap();
    let value = session.execute_string("(print)").unwrap();
    assert_eq!(session.render(value), None);
    assert!(session.wants_gc_stats());
}
