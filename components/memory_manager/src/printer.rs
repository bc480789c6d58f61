//! Textual rendering of values.
//!
//! [`display`] is what `to-string` and the CLI print. Strings print without
//! quotes and cycles print as `...`.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use core_types::{HeapId, Value};

use crate::heap::Heap;

// Nested lists and tables render recursively; grow the stack on demand.
const RED_ZONE: usize = 64 * 1024;
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Render `value` for humans; strings print without quotes.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use memory_manager::{display, Heap};
///
/// let mut heap = Heap::new();
/// let list = heap.alloc_list(&[Value::Integer(1), Value::Real(2.0)]).unwrap();
/// assert_eq!(display(&heap, list), "(1 2.0)");
/// ```
pub fn display(heap: &Heap, value: Value) -> String {
    Printer::new(heap).render(value)
}

/// Format a real so it never reads back as an integer
pub fn format_real(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

struct Printer<'h> {
    heap: &'h Heap,
    in_progress: FxHashSet<HeapId>,
    out: String,
}

impl<'h> Printer<'h> {
    fn new(heap: &'h Heap) -> Self {
        Self {
            heap,
            in_progress: FxHashSet::default(),
            out: String::new(),
        }
    }

    fn render(mut self, value: Value) -> String {
        self.value(value);
        self.out
    }

    fn value(&mut self, value: Value) {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.value_inner(value))
    }

    fn value_inner(&mut self, value: Value) {
        let heap = self.heap;
        match value {
            Value::Nil => self.out.push_str("nil"),
            Value::Boolean(b) => self.out.push_str(if b { "true" } else { "false" }),
            Value::Integer(n) => {
                let _ = write!(self.out, "{}", n);
            }
            Value::Real(n) => self.out.push_str(&format_real(n)),
            Value::Symbol(symbol) => self.out.push_str(heap.symbol_name(symbol)),
            Value::String(id) => self.out.push_str(heap.string(id)),
            Value::Cell(id) => self.guarded(id, Self::list),
            Value::Table(id) => self.guarded(id, Self::table),
            Value::Function(id) => match heap.function(id).code.name {
                Some(name) => {
                    let _ = write!(self.out, "#<function {}>", heap.symbol_name(name));
                }
                None => self.out.push_str("#<function>"),
            },
            Value::NativeFunction(id) => {
                let _ = write!(self.out, "#<native-function {}>", heap.native(id).name);
            }
            Value::Frame(_) => self.out.push_str("#<frame>"),
        }
    }

    fn guarded(&mut self, id: HeapId, render: fn(&mut Self, HeapId)) {
        if !self.in_progress.insert(id) {
            self.out.push_str("...");
            return;
        }
        render(self, id);
        self.in_progress.remove(&id);
    }

    fn list(&mut self, id: HeapId) {
        let heap = self.heap;
        let mut visited = vec![id];
        let mut cell = heap.cell(id);
        self.out.push('(');
        loop {
            self.value(cell.head);
            match cell.tail {
                Value::Nil => break,
                Value::Cell(next) if !self.in_progress.contains(&next) => {
                    self.out.push(' ');
                    self.in_progress.insert(next);
                    visited.push(next);
                    cell = heap.cell(next);
                }
                tail => {
                    self.out.push_str(" . ");
                    self.value(tail);
                    break;
                }
            }
        }
        self.out.push(')');
        // The head id is released by `guarded`.
        for next in &visited[1..] {
            self.in_progress.remove(next);
        }
    }

    fn table(&mut self, id: HeapId) {
        let heap = self.heap;
        let table = heap.table(id);
        self.out.push('{');
        for (index, (key, value)) in table.entries.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(heap.symbol_name(*key));
            self.out.push_str(": ");
            self.value(*value);
        }
        self.out.push('}');
    }
}
