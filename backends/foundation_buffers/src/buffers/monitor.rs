//! Monitor buffer: one lock, one condition, broadcast on every change.
//!
//! Producers waiting for a free slot and consumers waiting for an item park
//! on the same [`CondVar`]. Since a single condition cannot tell them apart,
//! every insertion and removal calls `notify_all`; each woken thread
//! re-checks its own predicate and parks again if it still cannot proceed.
//! Under contention most of those wake-ups are wasted.
//! [`ConditionBuffer`](super::ConditionBuffer) splits the condition in two.

use core::fmt;
use std::time::Instant;

use super::BoundedBuffer;
use crate::errors::{InsertError, Interrupted};
use crate::primitives::{
    lock_or_recover, remaining_until, wait_or_recover, wait_timeout_or_recover, CondVar,
    CondVarMutex,
};
use crate::storage::Storage;

struct MonitorState<T> {
    storage: Storage<T>,
    interrupts: u64,
}

pub struct MonitorBuffer<T> {
    state: CondVarMutex<MonitorState<T>>,
    changed: CondVar,
}

impl<T> MonitorBuffer<T> {
    /// Creates an empty buffer of `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: CondVarMutex::new(MonitorState {
                storage: Storage::new(capacity),
                interrupts: 0,
            }),
            changed: CondVar::new(),
        }
    }
}

impl<T: Send> BoundedBuffer<T> for MonitorBuffer<T> {
    fn put(&self, item: T) -> Result<(), InsertError<T>> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_full() {
            state = wait_or_recover(&self.changed, state);
            if state.interrupts != epoch {
                tracing::debug!(op = "put", "wait interrupted");
                return Err(InsertError::Interrupted(item));
            }
        }

        state.storage.raw_insert(item);
        tracing::trace!(op = "put", len = state.storage.len());
        self.changed.notify_all();
        Ok(())
    }

    fn get(&self) -> Result<T, Interrupted> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_empty() {
            state = wait_or_recover(&self.changed, state);
            if state.interrupts != epoch {
                tracing::debug!(op = "get", "wait interrupted");
                return Err(Interrupted);
            }
        }

        let item = state.storage.raw_remove();
        tracing::trace!(op = "get", len = state.storage.len());
        self.changed.notify_all();
        Ok(item)
    }

    fn add(&self, item: T) -> Result<(), InsertError<T>> {
        let mut state = lock_or_recover(&self.state);
        if state.storage.is_full() {
            tracing::trace!(op = "add", "buffer full");
            return Err(InsertError::Full(item));
        }

        state.storage.raw_insert(item);
        tracing::trace!(op = "add", len = state.storage.len());
        self.changed.notify_all();
        Ok(())
    }

    fn remove(&self) -> Option<T> {
        let mut state = lock_or_recover(&self.state);
        if state.storage.is_empty() {
            tracing::trace!(op = "remove", "buffer empty");
            return None;
        }

        let item = state.storage.raw_remove();
        tracing::trace!(op = "remove", len = state.storage.len());
        self.changed.notify_all();
        Some(item)
    }

    fn offer(&self, item: T, deadline: Instant) -> Result<(), InsertError<T>> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_full() {
            let Some(remaining) = remaining_until(deadline) else {
                tracing::trace!(op = "offer", "deadline reached");
                return Err(InsertError::Full(item));
            };
            state = wait_timeout_or_recover(&self.changed, state, remaining).0;
            if state.interrupts != epoch {
                tracing::debug!(op = "offer", "wait interrupted");
                return Err(InsertError::Interrupted(item));
            }
        }

        state.storage.raw_insert(item);
        tracing::trace!(op = "offer", len = state.storage.len());
        self.changed.notify_all();
        Ok(())
    }

    fn poll(&self, deadline: Instant) -> Result<Option<T>, Interrupted> {
        let mut state = lock_or_recover(&self.state);
        let epoch = state.interrupts;

        while state.storage.is_empty() {
            let Some(remaining) = remaining_until(deadline) else {
                tracing::trace!(op = "poll", "deadline reached");
                return Ok(None);
            };
            state = wait_timeout_or_recover(&self.changed, state, remaining).0;
            if state.interrupts != epoch {
                tracing::debug!(op = "poll", "wait interrupted");
                return Err(Interrupted);
            }
        }

        let item = state.storage.raw_remove();
        tracing::trace!(op = "poll", len = state.storage.len());
        self.changed.notify_all();
        Ok(Some(item))
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

        tracing::debug!("monitor buffer interrupted");
        self.changed.notify_all();
    }
}

impl<T> fmt::Debug for MonitorBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_or_recover(&self.state);
        f.debug_struct("MonitorBuffer")
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
    use tracing_test::traced_test;

    /// WHY: Every change must wake consumers parked on the shared condition
    /// WHAT: A consumer parked in get is released by add
    #[test]
    #[ntest::timeout(5000)]
    fn test_add_wakes_parked_consumer() {
        let buffer = Arc::new(MonitorBuffer::new(1));

        let buffer_clone = Arc::clone(&buffer);
        let consumer = thread::spawn(move || buffer_clone.get());

        thread::sleep(Duration::from_millis(20));
        assert!(buffer.add("X").is_ok());

        assert_eq!(consumer.join().unwrap(), Ok("X"));
        assert_eq!(buffer.len(), 0);
    }

    /// WHY: Broadcast wakes producers and consumers alike; both must recheck
    /// WHAT: Two parked producers and a remove let exactly one producer in
    #[test]
    #[ntest::timeout(5000)]
    fn test_broadcast_recheck_keeps_capacity() {
        let buffer = Arc::new(MonitorBuffer::new(1));
        buffer.add(0).unwrap();

        let producers: Vec<_> = (1..=2)
            .map(|value| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || buffer.put(value))
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        assert_eq!(buffer.remove(), Some(0));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(buffer.len(), 1);

        let first = buffer.get().unwrap();
        let second = buffer.get().unwrap();
        for producer in producers {
            producer.join().unwrap().unwrap();
        }

        let mut values = vec![first, second];
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    /// WHY: Interruption is logged for diagnosis
    /// WHAT: interrupt records a debug event and the parked poll returns Interrupted
    #[test]
    #[traced_test]
    fn test_interrupted_poll_is_logged() {
        let buffer = Arc::new(MonitorBuffer::<u8>::new(1));

        let buffer_clone = Arc::clone(&buffer);
        let waiter =
            thread::spawn(move || buffer_clone.poll(Instant::now() + Duration::from_secs(30)));

        thread::sleep(Duration::from_millis(30));
        buffer.interrupt();

        assert_eq!(waiter.join().unwrap(), Err(Interrupted));
        assert!(logs_contain("monitor buffer interrupted"));
    }
}
