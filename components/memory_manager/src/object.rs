//! Heap object kinds.
//!
//! Every heap-tagged [`Value`] refers to one of the [`HeapObject`] variants
//! stored in the [`Heap`](crate::Heap) arena. Objects reference each other
//! only through [`HeapId`]s, which is what lets the graph be cyclic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use core_types::{CallProfile, Exception, HeapId, LambdaExpr, Primitive, Symbol, Tag, Value};

use crate::Heap;

/// Host entry point of a native function.
///
/// Receives the heap (for allocation and inspection) and the evaluated
/// arguments in order. The argument count has already been checked against
/// the declared [`Arity`].
pub type NativeFn =
    Arc<dyn Fn(&mut Heap, &[Value]) -> Result<Value, Exception> + Send + Sync>;

/// Plain function pointer form of a native entry, used across the module ABI
pub type NativeEntry = fn(&mut Heap, &[Value]) -> Result<Value, Exception>;

/// Accepted argument counts of a native function.
///
/// # Examples
///
/// ```
/// use memory_manager::Arity;
///
/// let arity = Arity::at_least(1);
/// assert!(arity.accepts(3));
/// assert!(!arity.accepts(0));
/// assert_eq!(Arity::exact(2).to_string(), "2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum number of arguments
    pub min: usize,
    /// Maximum number of arguments, `None` for variadic
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `n` arguments
    pub fn exact(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// `n` or more arguments
    pub fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    /// Between `min` and `max` arguments inclusive
    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Whether a call with `count` arguments is allowed
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// A pair of values; chains of cells ending in nil form lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellObject {
    /// First element
    pub head: Value,
    /// Rest of the chain
    pub tail: Value,
}

/// Symbol-keyed mutable record with an optional prototype
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableObject {
    /// Own entries
    pub entries: BTreeMap<Symbol, Value>,
    /// Table consulted when a key is missing from `entries`
    pub prototype: Option<HeapId>,
}

/// An interpreted closure
#[derive(Debug, Clone)]
pub struct FunctionObject {
    /// Shared, immutable code body
    pub code: Arc<LambdaExpr>,
    /// Captured frame; calls create children of it
    pub env: HeapId,
    /// Hotness data and the compiled entry, if any
    pub profile: CallProfile,
}

/// A function backed by a host entry point
#[derive(Clone)]
pub struct NativeFunctionObject {
    /// Name used in error messages and printing
    pub name: Arc<str>,
    /// Accepted argument counts
    pub arity: Arity,
    /// Host entry point
    pub entry: NativeFn,
    /// Set by the prelude for operations the native backend can lower
    pub primitive: Option<Primitive>,
    /// Allocates before it mutates, so a call that ran out of memory may be
    /// repeated after a collection. Only the prelude sets it.
    pub restartable: bool,
}

impl fmt::Debug for NativeFunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunctionObject")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("primitive", &self.primitive)
            .field("restartable", &self.restartable)
            .finish_non_exhaustive()
    }
}

/// A lexical environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameObject {
    /// Bindings of this frame only
    pub bindings: BTreeMap<Symbol, Value>,
    /// Enclosing frame; `None` for the global frame
    pub parent: Option<HeapId>,
}

impl FrameObject {
    /// Create an empty frame below `parent`
    pub fn new(parent: Option<HeapId>) -> Self {
        Self {
            bindings: BTreeMap::new(),
            parent,
        }
    }
}

/// Any object stored in the heap
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// Immutable string contents
    String(Arc<str>),
    /// Cons cell
    Cell(CellObject),
    /// Table
    Table(TableObject),
    /// Interpreted closure
    Function(FunctionObject),
    /// Host function
    NativeFunction(NativeFunctionObject),
    /// Environment frame
    Frame(FrameObject),
}

impl HeapObject {
    /// The value tag of a reference to this object
    pub fn tag(&self) -> Tag {
        match self {
            HeapObject::String(_) => Tag::String,
            HeapObject::Cell(_) => Tag::Cell,
            HeapObject::Table(_) => Tag::Table,
            HeapObject::Function(_) => Tag::Function,
            HeapObject::NativeFunction(_) => Tag::NativeFunction,
            HeapObject::Frame(_) => Tag::Frame,
        }
    }

    /// Wrap `id` in the value variant matching this object
    pub fn value_for(&self, id: HeapId) -> Value {
        match self {
            HeapObject::String(_) => Value::String(id),
            HeapObject::Cell(_) => Value::Cell(id),
            HeapObject::Table(_) => Value::Table(id),
            HeapObject::Function(_) => Value::Function(id),
            HeapObject::NativeFunction(_) => Value::NativeFunction(id),
            HeapObject::Frame(_) => Value::Frame(id),
        }
    }

    /// Push every heap reference held by this object onto `out`
    pub fn trace(&self, out: &mut Vec<HeapId>) {
        let mut push = |value: &Value| {
            if let Some(id) = value.heap_id() {
                out.push(id);
            }
        };
        match self {
            HeapObject::String(_) | HeapObject::NativeFunction(_) => {}
            HeapObject::Cell(cell) => {
                push(&cell.head);
                push(&cell.tail);
            }
            HeapObject::Table(table) => {
                table.entries.values().for_each(&mut push);
                out.extend(table.prototype);
            }
            HeapObject::Function(function) => out.push(function.env),
            HeapObject::Frame(frame) => {
                frame.bindings.values().for_each(&mut push);
                out.extend(frame.parent);
            }
        }
    }
}
