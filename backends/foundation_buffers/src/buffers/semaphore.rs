//! Semaphore buffer: empty/full slot counting plus a storage guard.
//!
//! `empty_slots` starts at the capacity and `full_slots` at zero. An insert
//! takes an empty-slot permit, writes under the storage guard, then releases
//! a full-slot permit; a removal does the mirror image. The permits alone
//! only bound *how many* threads touch the storage at once; the guard orders
//! the cursor updates of concurrent producers (or concurrent consumers).
//!
//! Releasing a permit wakes one thread parked on that semaphore only.

use core::fmt;
use std::time::Instant;

use super::BoundedBuffer;
use crate::errors::{InsertError, Interrupted};
use crate::primitives::{lock_or_recover, CondVarMutex, Semaphore};
use crate::storage::Storage;

pub struct SemaphoreBuffer<T> {
    storage: CondVarMutex<Storage<T>>,
    empty_slots: Semaphore,
    full_slots: Semaphore,
}

impl<T> SemaphoreBuffer<T> {
    /// Creates an empty buffer of `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let storage = Storage::new(capacity);
        Self {
            storage: CondVarMutex::new(storage),
            empty_slots: Semaphore::new(capacity),
            full_slots: Semaphore::new(0),
        }
    }

    // Caller holds an `empty_slots` permit.
    fn insert_with_permit(&self, item: T, op: &str) {
        let mut storage = lock_or_recover(&self.storage);
        storage.raw_insert(item);
        tracing::trace!(op, len = storage.len());
        drop(storage);

        self.full_slots.release();
    }

    // Caller holds a `full_slots` permit.
    fn remove_with_permit(&self, op: &str) -> T {
        let mut storage = lock_or_recover(&self.storage);
        let item = storage.raw_remove();
        tracing::trace!(op, len = storage.len());
        drop(storage);

        self.empty_slots.release();
        item
    }
}

impl<T: Send> BoundedBuffer<T> for SemaphoreBuffer<T> {
    fn put(&self, item: T) -> Result<(), InsertError<T>> {
        if self.empty_slots.acquire().is_err() {
            tracing::debug!(op = "put", "wait interrupted");
            return Err(InsertError::Interrupted(item));
        }
        self.insert_with_permit(item, "put");
        Ok(())
    }

    fn get(&self) -> Result<T, Interrupted> {
        self.full_slots.acquire().inspect_err(|_| {
            tracing::debug!(op = "get", "wait interrupted");
        })?;
        Ok(self.remove_with_permit("get"))
    }

    fn add(&self, item: T) -> Result<(), InsertError<T>> {
        if !self.empty_slots.try_acquire() {
            return Err(InsertError::Full(item));
        }
        self.insert_with_permit(item, "add");
        Ok(())
    }

    fn remove(&self) -> Option<T> {
        if !self.full_slots.try_acquire() {
            return None;
        }
        Some(self.remove_with_permit("remove"))
    }

    fn offer(&self, item: T, deadline: Instant) -> Result<(), InsertError<T>> {
        match self.empty_slots.acquire_until(deadline) {
            Ok(true) => {
                self.insert_with_permit(item, "offer");
                Ok(())
            }
            Ok(false) => Err(InsertError::Full(item)),
            Err(Interrupted) => {
                tracing::debug!(op = "offer", "wait interrupted");
                Err(InsertError::Interrupted(item))
            }
        }
    }

    fn poll(&self, deadline: Instant) -> Result<Option<T>, Interrupted> {
        let acquired = self.full_slots.acquire_until(deadline).inspect_err(|_| {
            tracing::debug!(op = "poll", "wait interrupted");
        })?;
        Ok(acquired.then(|| self.remove_with_permit("poll")))
    }

    fn len(&self) -> usize {
        lock_or_recover(&self.storage).len()
    }

    fn capacity(&self) -> usize {
        lock_or_recover(&self.storage).capacity()
    }

    fn interrupt(&self) {
        tracing::debug!("semaphore buffer interrupted");
        self.empty_slots.interrupt();
        self.full_slots.interrupt();
    }
}

impl<T> fmt::Debug for SemaphoreBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphoreBuffer")
            .field("storage", &*lock_or_recover(&self.storage))
            .field("empty_slots", &self.empty_slots)
            .field("full_slots", &self.full_slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// WHY: Permit counts must mirror the stored items at rest
    /// WHAT: empty + full permits equal capacity and full permits equal len
    #[test]
    fn test_permits_track_len() {
        let buffer = SemaphoreBuffer::new(4);
        buffer.add(1).unwrap();
        buffer.add(2).unwrap();
        let _ = buffer.remove();

        assert_eq!(buffer.full_slots.available(), buffer.len());
        assert_eq!(
            buffer.empty_slots.available() + buffer.full_slots.available(),
            buffer.capacity()
        );
    }

    /// WHY: A timed-out offer must give its permit state back untouched
    /// WHAT: offer on a full buffer fails and leaves both semaphores as they were
    #[test]
    fn test_offer_timeout_leaves_permits() {
        let buffer = SemaphoreBuffer::new(1);
        buffer.add("a").unwrap();

        let result = buffer.offer("b", Instant::now() + Duration::from_millis(20));
        assert_eq!(result, Err(InsertError::Full("b")));
        assert_eq!(buffer.empty_slots.available(), 0);
        assert_eq!(buffer.full_slots.available(), 1);
    }

    /// WHY: Interrupting a parked get must not consume a full-slot permit
    /// WHAT: After interruption the permits still match the (empty) storage
    #[test]
    #[ntest::timeout(5000)]
    fn test_interrupted_get_keeps_permits() {
        let buffer = Arc::new(SemaphoreBuffer::<u8>::new(2));

        let buffer_clone = Arc::clone(&buffer);
        let consumer = thread::spawn(move || buffer_clone.get());

        thread::sleep(Duration::from_millis(30));
        buffer.interrupt();

        assert_eq!(consumer.join().unwrap(), Err(Interrupted));
        assert_eq!(buffer.full_slots.available(), 0);
        assert_eq!(buffer.empty_slots.available(), 2);

        buffer.put(9).unwrap();
        assert_eq!(buffer.get(), Ok(9));
    }

    /// WHY: Validates Debug implementation
    /// WHAT: Debug formatting includes the storage and both semaphores
    #[test]
    fn test_debug() {
        let buffer = SemaphoreBuffer::<u8>::new(2);
        let debug = format!("{buffer:?}");
        assert!(debug.contains("SemaphoreBuffer"));
        assert!(debug.contains("empty_slots"));
    }
}
