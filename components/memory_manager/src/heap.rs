//! Arena heap for Kai objects.
//!
//! Objects live in a vector of slots addressed by [`HeapId`]. A slot freed by
//! the collector bumps its generation, so a stale id can never silently alias
//! the object that reuses the slot.

use std::sync::Arc;

use core_types::{
    CallProfile, Exception, HeapId, LambdaExpr, Primitive, Symbol, SymbolTable, Value,
};
use thiserror::Error;

use crate::gc::MarkColor;
use crate::object::{
    Arity, CellObject, FrameObject, FunctionObject, HeapObject, NativeFn, NativeFunctionObject,
    TableObject,
};

/// Allocation failed because the heap reached its object limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("heap exhausted: {live} live objects, limit {limit}")]
pub struct OutOfMemory {
    /// Live objects at the time of the failure
    pub live: usize,
    /// Configured limit
    pub limit: usize,
}

impl From<OutOfMemory> for Exception {
    fn from(error: OutOfMemory) -> Self {
        Exception::out_of_memory(error.to_string())
    }
}

/// Heap sizing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Allocations between automatic collections
    pub gc_threshold: usize,
    /// Hard limit on live objects; `None` means unlimited
    pub max_objects: Option<usize>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            gc_threshold: 4096,
            max_objects: None,
        }
    }
}

/// Cumulative collector statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collections
    pub collections: u64,
    /// Objects allocated since the heap was created
    pub total_allocated: u64,
    /// Objects reclaimed since the heap was created
    pub total_freed: u64,
    /// Objects reclaimed by the most recent collection
    pub last_freed: usize,
    /// Objects currently live
    pub live_objects: usize,
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) mark: MarkColor,
    pub(crate) object: Option<HeapObject>,
}

/// The object arena plus the per-runtime symbol table.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use memory_manager::Heap;
///
/// let mut heap = Heap::new();
/// let cell = heap.alloc_cell(Value::Integer(1), Value::Nil).unwrap();
///
/// // Nothing roots the cell, so a collection reclaims it.
/// let report = heap.collect(std::iter::empty());
/// assert_eq!(report.freed, 1);
/// assert!(!heap.contains(cell.heap_id().unwrap()));
/// ```
#[derive(Debug)]
pub struct Heap {
    pub(crate) slots: Vec<Slot>,
    pub(crate) free: Vec<u32>,
    pub(crate) live: usize,
    pub(crate) allocated_since_collection: usize,
    pub(crate) next_collection: usize,
    pub(crate) stats: GcStats,
    config: HeapConfig,
    symbols: SymbolTable,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Creates a heap with the default configuration
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Creates a heap with the given configuration
    pub fn with_config(config: HeapConfig) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            allocated_since_collection: 0,
            next_collection: config.gc_threshold.max(1),
            stats: GcStats::default(),
            config,
            symbols: SymbolTable::new(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> HeapConfig {
        self.config
    }

    /// Number of live objects
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Collector statistics so far
    pub fn stats(&self) -> GcStats {
        GcStats {
            live_objects: self.live,
            ..self.stats
        }
    }

    /// Whether allocation pressure warrants a collection.
    ///
    /// True once `gc_threshold` allocations (or as many as survived the last
    /// collection, if more) happened since the last collection, or when the
    /// object limit has been reached.
    pub fn should_collect(&self) -> bool {
        self.allocated_since_collection >= self.next_collection || self.is_full()
    }

    /// Whether the next allocation would fail
    pub fn is_full(&self) -> bool {
        self.config
            .max_objects
            .map_or(false, |limit| self.live >= limit)
    }

    /// Store `object` and return its id.
    ///
    /// Never collects; fails with [`OutOfMemory`] when the object limit is
    /// reached. Callers that know the roots collect and retry.
    pub fn allocate(&mut self, object: HeapObject) -> Result<HeapId, OutOfMemory> {
        if let Some(limit) = self.config.max_objects {
            if self.live >= limit {
                return Err(OutOfMemory {
                    live: self.live,
                    limit,
                });
            }
        }

        self.live += 1;
        self.allocated_since_collection += 1;
        self.stats.total_allocated += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.mark = MarkColor::White;
            slot.object = Some(object);
            return Ok(HeapId::new(index, slot.generation));
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            mark: MarkColor::White,
            object: Some(object),
        });
        Ok(HeapId::new(index, 0))
    }

    /// Whether `id` refers to a live object
    pub fn contains(&self, id: HeapId) -> bool {
        self.try_get(id).is_some()
    }

    /// The object behind `id`, if it is still live
    pub fn try_get(&self, id: HeapId) -> Option<&HeapObject> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_ref())
    }

    /// The object behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is dangling. Reachable values are never freed, so this
    /// indicates a missing root.
    pub fn get(&self, id: HeapId) -> &HeapObject {
        match self.try_get(id) {
            Some(object) => object,
            None => dangling(id),
        }
    }

    /// Mutable access to the object behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is dangling.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapObject {
        match self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_mut())
        {
            Some(object) => object,
            None => dangling(id),
        }
    }

    // ---- symbols ----

    /// The runtime's symbol table
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access to the symbol table, used by the parser
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Intern `name`
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// The name of `symbol`
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbols.name(symbol)
    }

    // ---- typed allocation ----

    /// Allocate a string
    pub fn alloc_string(&mut self, text: &str) -> Result<Value, OutOfMemory> {
        self.alloc_shared_string(Arc::from(text))
    }

    /// Allocate a string sharing existing contents
    pub fn alloc_shared_string(&mut self, text: Arc<str>) -> Result<Value, OutOfMemory> {
        self.allocate(HeapObject::String(text)).map(Value::String)
    }

    /// Allocate a cell
    pub fn alloc_cell(&mut self, head: Value, tail: Value) -> Result<Value, OutOfMemory> {
        self.allocate(HeapObject::Cell(CellObject { head, tail }))
            .map(Value::Cell)
    }

    /// Allocate an empty table
    pub fn alloc_table(&mut self) -> Result<Value, OutOfMemory> {
        self.allocate(HeapObject::Table(TableObject::default()))
            .map(Value::Table)
    }

    /// Allocate a table holding `entries`
    pub fn alloc_table_from(
        &mut self,
        entries: impl IntoIterator<Item = (Symbol, Value)>,
    ) -> Result<Value, OutOfMemory> {
        let table = TableObject {
            entries: entries.into_iter().collect(),
            prototype: None,
        };
        self.allocate(HeapObject::Table(table)).map(Value::Table)
    }

    /// Allocate an empty frame below `parent`
    pub fn alloc_frame(&mut self, parent: Option<HeapId>) -> Result<HeapId, OutOfMemory> {
        self.allocate(HeapObject::Frame(FrameObject::new(parent)))
    }

    /// Allocate a closure over `env`
    pub fn alloc_function(
        &mut self,
        code: Arc<LambdaExpr>,
        env: HeapId,
    ) -> Result<Value, OutOfMemory> {
        self.allocate(HeapObject::Function(FunctionObject {
            code,
            env,
            profile: CallProfile::new(),
        }))
        .map(Value::Function)
    }

    /// Allocate a native function
    pub fn alloc_native(
        &mut self,
        name: &str,
        arity: Arity,
        entry: NativeFn,
        primitive: Option<Primitive>,
    ) -> Result<Value, OutOfMemory> {
        self.allocate(HeapObject::NativeFunction(NativeFunctionObject {
            name: Arc::from(name),
            arity,
            entry,
            primitive,
            restartable: false,
        }))
        .map(Value::NativeFunction)
    }

    /// Build a proper list of `items`
    pub fn alloc_list(&mut self, items: &[Value]) -> Result<Value, OutOfMemory> {
        let mut list = Value::Nil;
        for item in items.iter().rev() {
            list = self.alloc_cell(*item, list)?;
        }
        Ok(list)
    }

    // ---- typed access ----

    /// String contents behind `id`
    pub fn string(&self, id: HeapId) -> &Arc<str> {
        match self.get(id) {
            HeapObject::String(text) => text,
            other => mismatch(id, "string", other),
        }
    }

    /// Cell behind `id`
    pub fn cell(&self, id: HeapId) -> &CellObject {
        match self.get(id) {
            HeapObject::Cell(cell) => cell,
            other => mismatch(id, "cell", other),
        }
    }

    /// Mutable cell behind `id`
    pub fn cell_mut(&mut self, id: HeapId) -> &mut CellObject {
        match self.get_mut(id) {
            HeapObject::Cell(cell) => cell,
            other => mismatch(id, "cell", other),
        }
    }

    /// Table behind `id`
    pub fn table(&self, id: HeapId) -> &TableObject {
        match self.get(id) {
            HeapObject::Table(table) => table,
            other => mismatch(id, "table", other),
        }
    }

    /// Mutable table behind `id`
    pub fn table_mut(&mut self, id: HeapId) -> &mut TableObject {
        match self.get_mut(id) {
            HeapObject::Table(table) => table,
            other => mismatch(id, "table", other),
        }
    }

    /// Frame behind `id`
    pub fn frame(&self, id: HeapId) -> &FrameObject {
        match self.get(id) {
            HeapObject::Frame(frame) => frame,
            other => mismatch(id, "frame", other),
        }
    }

    /// Mutable frame behind `id`
    pub fn frame_mut(&mut self, id: HeapId) -> &mut FrameObject {
        match self.get_mut(id) {
            HeapObject::Frame(frame) => frame,
            other => mismatch(id, "frame", other),
        }
    }

    /// Closure behind `id`
    pub fn function(&self, id: HeapId) -> &FunctionObject {
        match self.get(id) {
            HeapObject::Function(function) => function,
            other => mismatch(id, "function", other),
        }
    }

    /// Mutable closure behind `id`
    pub fn function_mut(&mut self, id: HeapId) -> &mut FunctionObject {
        match self.get_mut(id) {
            HeapObject::Function(function) => function,
            other => mismatch(id, "function", other),
        }
    }

    /// Native function behind `id`
    pub fn native(&self, id: HeapId) -> &NativeFunctionObject {
        match self.get(id) {
            HeapObject::NativeFunction(native) => native,
            other => mismatch(id, "native function", other),
        }
    }

    /// Mutable native function behind `id`
    pub fn native_mut(&mut self, id: HeapId) -> &mut NativeFunctionObject {
        match self.get_mut(id) {
            HeapObject::NativeFunction(native) => native,
            other => mismatch(id, "native function", other),
        }
    }

    /// Look `key` up in a table and then along its prototype chain
    pub fn table_get(&self, id: HeapId, key: Symbol) -> Option<Value> {
        let mut current = Some(id);
        // Prototype links are kept acyclic by `set_prototype`, the bound only
        // protects against a chain built by a host through `table_mut`.
        let mut remaining = self.live;
        while let Some(table_id) = current {
            let table = self.table(table_id);
            if let Some(value) = table.entries.get(&key) {
                return Some(*value);
            }
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            current = table.prototype;
        }
        None
    }

    /// Set the prototype of table `id`.
    ///
    /// Fails with a TypeError if the link would create a prototype cycle.
    pub fn set_prototype(&mut self, id: HeapId, prototype: Option<HeapId>) -> Result<(), Exception> {
        let mut current = prototype;
        while let Some(ancestor) = current {
            if ancestor == id {
                return Err(Exception::type_error("prototype chain would form a cycle"));
            }
            current = self.table(ancestor).prototype;
        }
        self.table_mut(id).prototype = prototype;
        Ok(())
    }

    /// Collect the elements of a proper list.
    ///
    /// Returns `None` if the chain does not end in nil or loops back on
    /// itself.
    pub fn list_items(&self, list: Value) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        let mut current = list;
        loop {
            match current {
                Value::Nil => return Some(items),
                Value::Cell(id) => {
                    if items.len() > self.live {
                        return None;
                    }
                    let cell = self.cell(id);
                    items.push(cell.head);
                    current = cell.tail;
                }
                _ => return None,
            }
        }
    }
}

fn dangling(id: HeapId) -> ! {
    panic!("dangling heap reference {}", id)
}

fn mismatch(id: HeapId, expected: &str, found: &HeapObject) -> ! {
    panic!(
        "heap object {} is a {}, expected a {}",
        id,
        found.tag(),
        expected
    )
}
