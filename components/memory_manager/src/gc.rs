//! Mark-and-sweep garbage collection.
//!
//! Marking is iterative over an explicit gray worklist, so deep or cyclic
//! object graphs never recurse on the native stack. Sweeping runs to
//! completion in one call; no observer sees a half-swept heap.

use core_types::{HeapId, Value};

use crate::heap::Heap;

/// Mark colors for tri-color marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarkColor {
    /// Not yet reached
    White = 0,
    /// Reached, children not yet scanned
    Gray = 1,
    /// Reached and scanned
    Black = 2,
}

/// Outcome of one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Objects found reachable
    pub marked: usize,
    /// Objects reclaimed
    pub freed: usize,
    /// Objects live afterwards
    pub live: usize,
}

impl Heap {
    /// Run a full collection.
    ///
    /// Every object reachable from `roots` survives; everything else is
    /// dropped and its slot returned to the free list. The caller must pass
    /// the complete root set: globals, every frame and temporary of any
    /// in-flight evaluation, and host pins.
    ///
    /// # Returns
    ///
    /// Counts of marked and reclaimed objects.
    pub fn collect<I>(&mut self, roots: I) -> CollectionReport
    where
        I: IntoIterator<Item = Value>,
    {
        tracing::debug!(live = self.live, "gc: collection starting");

        let marked = self.mark(roots);
        let freed = self.sweep();

        self.stats.collections += 1;
        self.stats.total_freed += freed as u64;
        self.stats.last_freed = freed;
        self.allocated_since_collection = 0;
        self.next_collection = self.config().gc_threshold.max(self.live).max(1);

        tracing::debug!(marked, freed, live = self.live, "gc: collection finished");

        CollectionReport {
            marked,
            freed,
            live: self.live,
        }
    }

    fn mark<I>(&mut self, roots: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let mut gray: Vec<HeapId> = Vec::new();
        for root in roots {
            if let Some(id) = root.heap_id() {
                self.shade(id, &mut gray);
            }
        }

        let mut marked = 0;
        let mut children = Vec::new();
        while let Some(id) = gray.pop() {
            let slot = &mut self.slots[id.index()];
            slot.mark = MarkColor::Black;
            marked += 1;
            if let Some(object) = &slot.object {
                object.trace(&mut children);
            }
            for child in children.drain(..) {
                self.shade(child, &mut gray);
            }
        }
        marked
    }

    /// Move a white object to the gray worklist
    fn shade(&mut self, id: HeapId, gray: &mut Vec<HeapId>) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if slot.generation != id.generation() || slot.object.is_none() {
            return;
        }
        if slot.mark == MarkColor::White {
            slot.mark = MarkColor::Gray;
            gray.push(id);
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.mark == MarkColor::White {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            } else {
                slot.mark = MarkColor::White;
            }
        }
        self.live -= freed;
        freed
    }
}
