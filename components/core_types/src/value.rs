//! Kai value representation.
//!
//! This module provides the core `Value` enum. Immediate values (nil,
//! booleans, numbers, symbols) are stored inline, heap values are referenced
//! by a [`HeapId`] handed out by the memory manager.

use std::fmt;

use crate::Symbol;

/// Identity of a heap-allocated object.
///
/// The index addresses a slot in the heap arena; the generation changes every
/// time the slot is reused, so a stale id never aliases a newer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId {
    index: u32,
    generation: u32,
}

impl HeapId {
    /// Create an id for the given slot and generation
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the heap arena
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was issued
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

/// The fixed set of value kinds.
///
/// There is no runtime subtyping beyond these tags; host-defined types are
/// exposed as native functions closing over opaque handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The absent value
    Nil,
    /// `true` or `false`
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// IEEE 754 double
    Real,
    /// Immutable heap string
    String,
    /// Interned identifier
    Symbol,
    /// Mutable head/tail pair
    Cell,
    /// Mutable symbol-keyed mapping
    Table,
    /// Interpreted closure
    Function,
    /// Host-provided function
    NativeFunction,
    /// Lexical environment
    Frame,
}

impl Tag {
    /// Name of the tag as seen by `type-of`
    pub fn name(self) -> &'static str {
        match self {
            Tag::Nil => "nil",
            Tag::Boolean => "boolean",
            Tag::Integer => "integer",
            Tag::Real => "real",
            Tag::String => "string",
            Tag::Symbol => "symbol",
            Tag::Cell => "cell",
            Tag::Table => "table",
            Tag::Function => "function",
            Tag::NativeFunction => "native-function",
            Tag::Frame => "frame",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents any Kai value.
///
/// `Value` is `Copy`: heap variants carry only the [`HeapId`] of their object,
/// so copying a value never copies the object it refers to.
///
/// `==` on values is identity equality. Immediates compare by content, heap
/// values compare by id. Structural comparison needs the heap and lives in the
/// memory manager.
///
/// # Examples
///
/// ```
/// use core_types::{Tag, Value};
///
/// assert!(!Value::Nil.is_truthy());
/// assert!(!Value::Boolean(false).is_truthy());
/// assert!(Value::Integer(0).is_truthy());
/// assert_eq!(Value::Real(1.5).tag(), Tag::Real);
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// Kai nil
    Nil,
    /// Kai boolean
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// Double-precision real
    Real(f64),
    /// Heap string
    String(HeapId),
    /// Interned symbol
    Symbol(Symbol),
    /// Heap cell
    Cell(HeapId),
    /// Heap table
    Table(HeapId),
    /// Interpreted function
    Function(HeapId),
    /// Host function
    NativeFunction(HeapId),
    /// Lexical frame
    Frame(HeapId),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b))
            | (Value::Cell(a), Value::Cell(b))
            | (Value::Table(a), Value::Table(b))
            | (Value::Function(a), Value::Function(b))
            | (Value::NativeFunction(a), Value::NativeFunction(b))
            | (Value::Frame(a), Value::Frame(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns the tag of this value
    pub fn tag(&self) -> Tag {
        match self {
            Value::Nil => Tag::Nil,
            Value::Boolean(_) => Tag::Boolean,
            Value::Integer(_) => Tag::Integer,
            Value::Real(_) => Tag::Real,
            Value::String(_) => Tag::String,
            Value::Symbol(_) => Tag::Symbol,
            Value::Cell(_) => Tag::Cell,
            Value::Table(_) => Tag::Table,
            Value::Function(_) => Tag::Function,
            Value::NativeFunction(_) => Tag::NativeFunction,
            Value::Frame(_) => Tag::Frame,
        }
    }

    /// Returns whether this value counts as true in a condition.
    ///
    /// Only `nil` and `false` are false; `0`, `""` and the empty table are true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Returns true for `nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The heap object this value refers to, if any
    pub fn heap_id(&self) -> Option<HeapId> {
        match self {
            Value::String(id)
            | Value::Cell(id)
            | Value::Table(id)
            | Value::Function(id)
            | Value::NativeFunction(id)
            | Value::Frame(id) => Some(*id),
            Value::Nil
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Real(_)
            | Value::Symbol(_) => None,
        }
    }

    /// Returns the integer payload, if this is an Integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a real number if it is numeric
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for values callable through application
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::NativeFunction(_))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Real(n)
    }
}
