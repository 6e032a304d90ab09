//! Bounded FIFO replay window.
//!
//! An explicit ring buffer (arena + head index) rather than a growable
//! container: memory is bounded by construction, mutation is an explicit
//! operation, and overflow behavior is defined, not exceptional. Both the
//! timeline window and the anomaly feed are instances of this structure,
//! as is the system event journal.
//!
//! Invariants:
//! - `len() <= capacity()` at all times
//! - iteration order == arrival order (oldest first)
//! - overflow evicts exactly the oldest entry and returns it

/// Fixed-capacity ring buffer with FIFO eviction.
#[derive(Debug, Clone)]
pub struct ReplayWindow<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> ReplayWindow<T> {
    /// Create an empty window. `capacity` must be at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Append a value, evicting and returning the oldest entry when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.len < self.slots.len() {
            let tail = (self.head + self.len) % self.slots.len();
            self.slots[tail] = Some(value);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(value);
            self.head = (self.head + 1) % self.slots.len();
            evicted
        }
    }

    /// Entry at logical position `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[(self.head + index) % self.slots.len()].as_ref()
    }

    /// Newest entry, if any.
    pub fn back(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            self.get(self.len - 1)
        }
    }

    /// Iterate oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Position of the first entry matching `pred`, oldest-first.
    pub fn position_of<F: Fn(&T) -> bool>(&self, pred: F) -> Option<usize> {
        (0..self.len).find(|&i| self.get(i).map(&pred).unwrap_or(false))
    }

    /// Drop all entries. Capacity is unchanged.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
