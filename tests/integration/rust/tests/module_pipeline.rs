//! Native module integration tests
//!
//! Static registration through the runtime, the loader's search over
//! configured directories, and the `kai_math` library built as a cdylib.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use core_types::{ErrorKind, Value};
use integration_tests::{eval_display, interpreted, runtime};
use interpreter::RuntimeConfig;
use module_loader::{ModuleLoader, ModuleSource};
use tempfile::TempDir;

#[test]
fn test_static_math_module() {
    let mut rt = interpreted();
    rt.register_module(Arc::new(kai_math::kai_module_declaration));
    rt.eval_str("(require kai_math)").unwrap();
    assert_eq!(
        rt.eval_str("((get kai_math 'square) 12)").unwrap(),
        Value::Integer(144)
    );
    assert_eq!(
        rt.eval_str("((get kai_math 'gcd) 84 36)").unwrap(),
        Value::Integer(12)
    );
    assert_eq!(eval_display(&mut rt, "((get kai_math 'hypot) 3 4)"), "5.0");
}

#[test]
fn test_module_errors_reach_the_language() {
    let mut rt = interpreted();
    rt.register_module(Arc::new(kai_math::kai_module_declaration));
    rt.eval_str("(require kai_math)").unwrap();
    let error = rt.eval_str("((get kai_math 'gcd) 1.5 2)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::TypeError));
    let error = rt.eval_str("((get kai_math 'square))").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::ArityError));
}

#[test]
fn test_module_table_cached_across_rebinding() {
    let mut rt = interpreted();
    rt.register_module(Arc::new(kai_math::kai_module_declaration));
    rt.eval_str("(define first (require kai_math)) (set! kai_math nil)")
        .unwrap();
    rt.collect();
    assert_eq!(
        rt.eval_str("(eq? first (require kai_math))").unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_missing_library_in_search_path() {
    let dir = TempDir::new().unwrap();
    let mut rt = runtime(
        RuntimeConfig::default()
            .with_jit_enabled(false)
            .with_module_path(dir.path()),
    );
    let error = rt.eval_str("(require absent)").unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::ModuleLoadError));
    assert!(error.to_string().contains("absent"));
}

#[test]
fn test_loader_searches_in_order() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let loader = ModuleLoader::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
    let Err(error) = loader.resolve("nothing") else {
        panic!("nothing should not resolve");
    };
    let text = error.to_string();
    let a = text.find(&*first.path().to_string_lossy()).unwrap();
    let b = text.find(&*second.path().to_string_lossy()).unwrap();
    assert!(a < b);
}

// =============================================================================
// Dynamic loading of the built kai_math library
// =============================================================================

/// Directories cargo may have placed the kai_math cdylib in
fn library_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    // Test binaries live in <target>/<profile>/deps.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(deps) = exe.parent() {
            dirs.push(deps.to_path_buf());
            if let Some(profile) = deps.parent() {
                dirs.push(profile.to_path_buf());
            }
        }
    }
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../target"));
    dirs.push(target.join("debug"));
    dirs.push(target.join("release"));
    dirs
}

fn find_library(name: &str) -> Option<PathBuf> {
    let file_name = libloading::library_filename(name);
    library_dirs()
        .into_iter()
        .find(|dir| dir.join(&file_name).is_file())
}

/// Directory holding a built kai_math cdylib, building it if needed
fn kai_math_dir() -> PathBuf {
    if let Some(dir) = find_library("kai_math") {
        return dir;
    }
    let cargo = std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into());
    let status = Command::new(cargo)
        .args(["build", "-p", "kai_math"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .status()
        .unwrap();
    assert!(status.success(), "building kai_math failed");
    find_library("kai_math").unwrap_or_else(|| panic!("no kai_math library in {:?}", library_dirs()))
}

#[test]
fn test_built_library_loads_through_search_path() {
    let dir = kai_math_dir();
    let mut rt = runtime(
        RuntimeConfig::default()
            .with_jit_enabled(false)
            .with_module_path(&dir),
    );
    assert!(matches!(
        rt.loader_mut().resolve("kai_math").unwrap(),
        ModuleSource::Library(_)
    ));

    assert_eq!(
        rt.eval_str("(eq? (require kai_math) (require kai_math))").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        rt.eval_str("((get kai_math 'square) 12)").unwrap(),
        Value::Integer(144)
    );
    assert_eq!(eval_display(&mut rt, "((get kai_math 'hypot) 3 4)"), "5.0");
    assert_eq!(rt.loader_mut().open_libraries(), 1);
}

#[test]
fn test_loading_a_library_twice_reuses_the_handle() {
    let dir = kai_math_dir();
    let mut loader = ModuleLoader::new(vec![dir]);
    let first = loader.load("kai_math").unwrap();
    let second = loader.load("kai_math").unwrap();
    assert_eq!(loader.open_libraries(), 1);

    let names = |module: &module_loader::LoadedModule| -> Vec<String> {
        module.functions.iter().map(|f| f.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert!(names(&first).contains(&"square".to_string()));

    // Functions from either load stay callable after the other is dropped.
    drop(first);
    let square = second
        .functions
        .iter()
        .find(|f| f.name == "square")
        .unwrap();
    let mut heap = memory_manager::Heap::new();
    assert_eq!(
        (square.entry)(&mut heap, &[Value::Integer(9)]).unwrap(),
        Value::Integer(81)
    );
}
