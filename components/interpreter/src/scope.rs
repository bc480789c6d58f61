//! Frame / scope chain operations.
//!
//! Frames form a singly linked chain through their parent links. Lookup and
//! assignment walk outwards from the innermost frame; definition always
//! targets the given frame itself.

use core_types::{Exception, HeapId, Symbol, Value};
use memory_manager::Heap;

/// Find the innermost binding of `symbol`, if any
pub fn resolve(heap: &Heap, frame: HeapId, symbol: Symbol) -> Option<Value> {
    let mut current = Some(frame);
    while let Some(id) = current {
        let frame = heap.frame(id);
        if let Some(value) = frame.bindings.get(&symbol) {
            return Some(*value);
        }
        current = frame.parent;
    }
    None
}

/// The value of `symbol` as seen from `frame`.
///
/// # Errors
///
/// UnboundVariable when no frame of the chain binds it.
pub fn lookup(heap: &Heap, frame: HeapId, symbol: Symbol) -> Result<Value, Exception> {
    resolve(heap, frame, symbol).ok_or_else(|| Exception::unbound(heap.symbol_name(symbol)))
}

/// Create or overwrite a binding in `frame` itself
pub fn define(heap: &mut Heap, frame: HeapId, symbol: Symbol, value: Value) {
    heap.frame_mut(frame).bindings.insert(symbol, value);
}

/// Mutate the innermost existing binding of `symbol`.
///
/// # Errors
///
/// UnboundVariable when no frame of the chain binds it; nothing is created.
pub fn assign(heap: &mut Heap, frame: HeapId, symbol: Symbol, value: Value) -> Result<(), Exception> {
    let mut current = Some(frame);
    while let Some(id) = current {
        let frame = heap.frame_mut(id);
        if let Some(slot) = frame.bindings.get_mut(&symbol) {
            *slot = value;
            return Ok(());
        }
        current = frame.parent;
    }
    Err(Exception::unbound(heap.symbol_name(symbol)))
}
