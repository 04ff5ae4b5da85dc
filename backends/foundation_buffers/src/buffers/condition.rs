//! Split-condition buffer: one lock, a `not_full` and a `not_empty` condition.
//!
//! Producers park on `not_full` and consumers on `not_empty`. An insertion
//! broadcasts `not_empty` only and a removal broadcasts `not_full` only, so a
//! state change never wakes threads that still cannot make progress because
//! of it. The observable contract is the same as
//! [`MonitorBuffer`](super::MonitorBuffer).

use core::fmt;
use std::time::Instant;

use super::BoundedBuffer;
use crate::errors::{InsertError, Interrupted};
use crate::primitives::{
    lock_or_recover, remaining_until, wait_or_recover, wait_timeout_or_recover, CondVar,
    CondVarMutex, CondVarMutexGuard,
};
use crate::storage::Storage;

struct ConditionState<T> {
    storage: Storage<T>,
    interrupts: u64,
}

pub struct ConditionBuffer<T> {
    state: CondVarMutex<ConditionState<T>>,
    not_full: CondVar,
    not_empty: CondVar,
}

impl<T> ConditionBuffer<T> {
    /// Creates an empty buffer of `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: CondVarMutex::new(ConditionState {
                storage: Storage::new(capacity),
                interrupts: 0,
            }),
            not_full: CondVar::new(),
            not_empty: CondVar::new(),
        }
    }

    fn insert_locked(&self, mut state: CondVarMutexGuard<'_, ConditionState<T>>, item: T, op: &str) {
        state.storage.raw_insert(item);
        tracing::trace!(op, len = state.storage.len());
        drop(state);
        self.not_empty.notify_all();
    }

    fn remove_locked(&self, mut state: CondVarMutexGuard<'_, ConditionState<T>>, op: &str) -> T {
        let item = state.storage.raw_remove();
        tracing::trace!(op, len = state.storage.len());
        drop(state);
        self.not_full.notify_all();
        item
    }
}

impl<T: Send> BoundedBuffer<T> for ConditionBuffer<T> {
    fn put(&self, item: T) -> Result<(), InsertError<T>> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_full() {
            state = wait_or_recover(&self.not_full, state);
            if state.interrupts != epoch {
                tracing::debug!(op = "put", "wait interrupted");
                return Err(InsertError::Interrupted(item));
            }
        }

        self.insert_locked(state, item, "put");
        Ok(())
    }

    fn get(&self) -> Result<T, Interrupted> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_empty() {
            state = wait_or_recover(&self.not_empty, state);
            if state.interrupts != epoch {
                tracing::debug!(op = "get", "wait interrupted");
                return Err(Interrupted);
            }
        }

        Ok(self.remove_locked(state, "get"))
    }

    fn add(&self, item: T) -> Result<(), InsertError<T>> {
        let state = lock_or_recover(&self.state);
        if state.storage.is_full() {
            return Err(InsertError::Full(item));
        }

        self.insert_locked(state, item, "add");
        Ok(())
    }

    fn remove(&self) -> Option<T> {
        let state = lock_or_recover(&self.state);
        if state.storage.is_empty() {
            return None;
        }

        Some(self.remove_locked(state, "remove"))
    }

    fn offer(&self, item: T, deadline: Instant) -> Result<(), InsertError<T>> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_full() {
            let Some(remaining) = remaining_until(deadline) else {
                return Err(InsertError::Full(item));
            };
            state = wait_timeout_or_recover(&self.not_full, state, remaining).0;
            if state.interrupts != epoch {
                tracing::debug!(op = "offer", "wait interrupted");
                return Err(InsertError::Interrupted(item));
            }
        }

        self.insert_locked(state, item, "offer");
        Ok(())
    }

    fn poll(&self, deadline: Instant) -> Result<Option<T>, Interrupted> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_empty() {
            let Some(remaining) = remaining_until(deadline) else {
                return Ok(None);
            };
            state = wait_timeout_or_recover(&self.not_empty, state, remaining).0;
            if state.interrupts != epoch {
                tracing::debug!(op = "poll", "wait interrupted");
                return Err(Interrupted);
            }
        }

        Ok(Some(self.remove_locked(state, "poll")))
    }

    fn len(&self) -> usize {
        lock_or_recover(&self.state).storage.len()
    }

    fn capacity(&self) -> usize {
        lock_or_recover(&self.state).storage.capacity()
    }

    fn interrupt(&self) {
        let mut state = lock_or_recover(&self.state);
        state.interrupts = state.interrupts.wrapping_add(1);
        drop(state);

        tracing::debug!("condition buffer interrupted");
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

impl<T> fmt::Debug for ConditionBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_or_recover(&self.state);
        f.debug_struct("ConditionBuffer")
            .field("storage", &state.storage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// WHY: Removals must wake producers parked on `not_full`
    /// WHAT: A producer parked in put proceeds once remove frees a slot
    #[test]
    #[ntest::timeout(5000)]
    fn test_remove_wakes_parked_producer() {
        let buffer = Arc::new(ConditionBuffer::new(1));
        buffer.add(1).unwrap();

        let buffer_clone = Arc::clone(&buffer);
        let producer = thread::spawn(move || buffer_clone.put(2));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(buffer.remove(), Some(1));

        producer.join().unwrap().unwrap();
        assert_eq!(buffer.remove(), Some(2));
    }

    /// WHY: Interruption must reach threads on either condition
    /// WHAT: A producer parked on not_full and a consumer parked on not_empty both return
    #[test]
    #[ntest::timeout(5000)]
    fn test_interrupt_reaches_both_conditions() {
        let full = Arc::new(ConditionBuffer::new(1));
        full.add(0u32).unwrap();
        let empty = Arc::new(ConditionBuffer::<u32>::new(1));

        let producer = {
            let full = Arc::clone(&full);
            thread::spawn(move || full.put(1))
        };
        let consumer = {
            let empty = Arc::clone(&empty);
            thread::spawn(move || empty.get())
        };

        thread::sleep(Duration::from_millis(30));
        full.interrupt();
        empty.interrupt();

        assert_eq!(producer.join().unwrap(), Err(InsertError::Interrupted(1)));
        assert_eq!(consumer.join().unwrap(), Err(Interrupted));
        assert_eq!(full.len(), 1);
        assert_eq!(empty.len(), 0);
    }
}
