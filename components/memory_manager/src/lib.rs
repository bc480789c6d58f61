//! Memory Manager - Kai heap and garbage collection
//!
//! This component provides:
//! - Arena allocation of every heap object kind behind stable [`HeapId`]s
//! - A tracing mark-and-sweep collector that reclaims cyclic garbage
//! - Structural (deep, cycle-safe) equality over heap values
//! - The printer used for `to-string` and host-side display
//!
//! The heap never collects on its own: it only reports pressure through
//! [`Heap::should_collect`]. The evaluator, which knows every root, decides
//! when to call [`Heap::collect`].
//!
//! [`HeapId`]: core_types::HeapId

pub mod equality;
pub mod gc;
pub mod heap;
pub mod object;
pub mod printer;

// Re-export main types
pub use equality::structurally_equal;
pub use gc::{CollectionReport, MarkColor};
pub use heap::{GcStats, Heap, HeapConfig, OutOfMemory};
pub use object::{
    Arity, CellObject, FrameObject, FunctionObject, HeapObject, NativeEntry, NativeFn,
    NativeFunctionObject, TableObject,
};
pub use printer::{display, format_real};
