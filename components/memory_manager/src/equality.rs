//! Structural equality.
//!
//! Identity is `Value == Value`. Structural equality compares contents and
//! is cycle-safe: a pair of objects already under comparison that is met
//! again is assumed equal, so mutually cyclic structures terminate.

use rustc_hash::FxHashSet;

use core_types::{HeapId, Value};

use crate::heap::Heap;
use crate::object::HeapObject;

/// Deep comparison of `a` and `b`.
///
/// Strings compare by contents, cells element-wise, tables by key set,
/// values and prototype. Functions, native functions and frames only equal
/// themselves. Numbers of different tags are never structurally equal.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use memory_manager::{structurally_equal, Heap};
///
/// let mut heap = Heap::new();
/// let key = heap.intern("a");
/// let x = heap.alloc_table_from([(key, Value::Integer(1))]).unwrap();
/// let y = heap.alloc_table_from([(key, Value::Integer(1))]).unwrap();
///
/// assert_ne!(x, y);
/// assert!(structurally_equal(&heap, x, y));
/// ```
pub fn structurally_equal(heap: &Heap, a: Value, b: Value) -> bool {
    let mut pending = vec![(a, b)];
    let mut assumed: FxHashSet<(HeapId, HeapId)> = FxHashSet::default();

    while let Some((left, right)) = pending.pop() {
        if left == right {
            continue;
        }
        match (left, right) {
            (Value::String(x), Value::String(y)) => {
                if heap.string(x) != heap.string(y) {
                    return false;
                }
            }
            (Value::Cell(x), Value::Cell(y)) | (Value::Table(x), Value::Table(y)) => {
                if !assumed.insert((x, y)) {
                    continue;
                }
                if !expand(heap, x, y, &mut pending) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Queue the component pairs of two compound objects.
///
/// Returns false when their shapes already differ.
fn expand(heap: &Heap, x: HeapId, y: HeapId, pending: &mut Vec<(Value, Value)>) -> bool {
    match (heap.get(x), heap.get(y)) {
        (HeapObject::Cell(a), HeapObject::Cell(b)) => {
            pending.push((a.tail, b.tail));
            pending.push((a.head, b.head));
            true
        }
        (HeapObject::Table(a), HeapObject::Table(b)) => {
            if a.entries.len() != b.entries.len() {
                return false;
            }
            match (a.prototype, b.prototype) {
                (None, None) => {}
                (Some(p), Some(q)) => pending.push((Value::Table(p), Value::Table(q))),
                _ => return false,
            }
            for (key, value) in &a.entries {
                match b.entries.get(key) {
                    Some(other) => pending.push((*value, *other)),
                    None => return false,
                }
            }
            true
        }
        _ => false,
    }
}
