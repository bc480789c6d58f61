//! Contract tests verifying the memory_manager public API.
//! These tests exercise the heap the way the evaluator drives it.

use std::sync::Arc;

use core_types::{ErrorKind, Exception, LambdaExpr, Value};
use memory_manager::{
    display, structurally_equal, Arity, Heap, HeapConfig, HeapObject,
};

fn first(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(args[0])
}

/// Test Heap contract: new() starts empty
#[test]
fn contract_heap_new() {
    let heap = Heap::new();
    assert_eq!(heap.live_objects(), 0);
    assert_eq!(heap.stats().collections, 0);
    assert!(!heap.should_collect());
}

/// Test Heap contract: every allocation kind yields the matching tag
#[test]
fn contract_heap_allocation_tags() {
    let mut heap = Heap::new();
    let frame = heap.alloc_frame(None).unwrap();
    let code = Arc::new(LambdaExpr {
        name: None,
        params: vec![],
        body: vec![],
    });

    let values = [
        heap.alloc_string("s").unwrap(),
        heap.alloc_cell(Value::Nil, Value::Nil).unwrap(),
        heap.alloc_table().unwrap(),
        heap.alloc_function(code, frame).unwrap(),
        heap.alloc_native("first", Arity::exact(1), Arc::new(first), None)
            .unwrap(),
        Value::Frame(frame),
    ];
    for value in values {
        let id = value.heap_id().unwrap();
        assert_eq!(heap.get(id).tag(), value.tag());
        assert_eq!(heap.get(id).value_for(id), value);
    }
    assert_eq!(heap.live_objects(), 6);
}

/// Test Heap contract: collect(roots) keeps exactly the reachable set
#[test]
fn contract_collect_reachability() {
    let mut heap = Heap::new();
    let global = heap.alloc_frame(None).unwrap();
    let key = heap.intern("list");
    let list = heap
        .alloc_list(&[Value::Integer(1), Value::Integer(2)])
        .unwrap();
    heap.frame_mut(global).bindings.insert(key, list);

    // Unreachable cycle between a table and a cell
    let table = heap.alloc_table().unwrap();
    let cell = heap.alloc_cell(table, Value::Nil).unwrap();
    let back = heap.intern("back");
    heap.table_mut(table.heap_id().unwrap())
        .entries
        .insert(back, cell);

    let report = heap.collect([Value::Frame(global)]);
    assert_eq!(report.marked, 3);
    assert_eq!(report.freed, 2);
    assert_eq!(display(&heap, list), "(1 2)");
}

/// Test Heap contract: a full heap fails allocation with OutOfMemory
#[test]
fn contract_allocation_failure() {
    let mut heap = Heap::with_config(HeapConfig {
        gc_threshold: 10,
        max_objects: Some(1),
    });
    let kept = heap.alloc_string("kept").unwrap();
    let error: Exception = heap.alloc_table().unwrap_err().into();
    assert_eq!(error.kind, ErrorKind::OutOfMemory);

    // The failed allocation did not disturb the live object
    assert_eq!(display(&heap, kept), "kept");
}

/// Test structurally_equal contract: content-identical tables are equal, not identical
#[test]
fn contract_structural_vs_identity() {
    let mut heap = Heap::new();
    let name = heap.intern("name");
    let a_name = heap.alloc_string("kai").unwrap();
    let b_name = heap.alloc_string("kai").unwrap();
    let a = heap.alloc_table_from([(name, a_name)]).unwrap();
    let b = heap.alloc_table_from([(name, b_name)]).unwrap();

    assert!(a != b);
    assert!(structurally_equal(&heap, a, b));
}

/// Test HeapObject contract: function objects reference their environment
#[test]
fn contract_function_traces_env() {
    let mut heap = Heap::new();
    let env = heap.alloc_frame(None).unwrap();
    let code = Arc::new(LambdaExpr {
        name: None,
        params: vec![],
        body: vec![],
    });
    let function = heap.alloc_function(code, env).unwrap();

    let mut children = Vec::new();
    if let HeapObject::Function(_) = heap.get(function.heap_id().unwrap()) {
        heap.get(function.heap_id().unwrap()).trace(&mut children);
    }
    assert_eq!(children, vec![env]);

    heap.collect([function]);
    assert!(heap.contains(env));
}
