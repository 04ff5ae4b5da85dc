//! Fixed-capacity circular storage with no synchronization of its own.
//!
//! [`Storage`] only knows how to move items in and out of a ring of slots.
//! It never enforces its capacity: the buffers that own it decide when an
//! insert or removal is allowed and call the raw primitives under their own
//! locking discipline.

use core::fmt;

/// A ring of `capacity` slots addressed by a head (next removal) and a tail
/// (next insertion) cursor.
pub struct Storage<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T> Storage<T> {
    /// Creates empty storage able to hold `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Writes `item` at the tail cursor and advances it.
    ///
    /// The caller must have checked that the storage is not full.
    pub fn raw_insert(&mut self, item: T) {
        debug_assert!(self.count < self.capacity(), "raw_insert on full storage");
        debug_assert!(self.slots[self.tail].is_none());

        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
    }

    /// Takes the item at the head cursor and advances it.
    ///
    /// The caller must have checked that the storage is not empty.
    ///
    /// # Panics
    ///
    /// Panics if called on empty storage.
    pub fn raw_remove(&mut self) -> T {
        debug_assert!(self.count > 0, "raw_remove on empty storage");

        let item = self.slots[self.head]
            .take()
            .expect("head slot is occupied while count > 0");
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        item
    }

    /// Number of items currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("capacity", &self.capacity())
            .field("count", &self.count)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
