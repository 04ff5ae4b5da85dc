//! Bounded buffers shared between producer and consumer threads.
//!
//! Every buffer implements the same [`BoundedBuffer`] contract:
//!
//! | Operation | Insert                 | Remove             |
//! |-----------|------------------------|--------------------|
//! | Blocking  | [`put`]                | [`get`]            |
//! | Immediate | [`add`]                | [`remove`]         |
//! | Deadline  | [`offer`]              | [`poll`]           |
//!
//! Three strategies provide it:
//!
//! - [`MonitorBuffer`]: one lock and one condition; every state change wakes
//!   every parked thread, whichever predicate it waits on.
//! - [`ConditionBuffer`]: one lock and two conditions (`not_full`,
//!   `not_empty`); insertions only wake consumers and removals only wake
//!   producers.
//! - [`SemaphoreBuffer`]: two counting semaphores for empty and full slots,
//!   plus a separate lock around the storage cursors.
//!
//! The buffer behaves as a FIFO queue. Which of several parked threads
//! proceeds first is unspecified.
//!
//! [`put`]: BoundedBuffer::put
//! [`get`]: BoundedBuffer::get
//! [`add`]: BoundedBuffer::add
//! [`remove`]: BoundedBuffer::remove
//! [`offer`]: BoundedBuffer::offer
//! [`poll`]: BoundedBuffer::poll

mod condition;
mod monitor;
mod semaphore;

pub use condition::ConditionBuffer;
pub use monitor::MonitorBuffer;
pub use semaphore::SemaphoreBuffer;

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, InsertError, Interrupted};

/// The six-operation bounded buffer contract.
///
/// Implementations are shared between threads behind an [`Arc`]; all
/// operations take `&self`.
pub trait BoundedBuffer<T>: Send + Sync {
    /// Inserts `item`, parking the caller while the buffer is full.
    ///
    /// # Errors
    ///
    /// [`InsertError::Interrupted`] if [`BoundedBuffer::interrupt`] is called
    /// while the caller is parked.
    fn put(&self, item: T) -> Result<(), InsertError<T>>;

    /// Removes the oldest item, parking the caller while the buffer is empty.
    ///
    /// # Errors
    ///
    /// [`Interrupted`] if [`BoundedBuffer::interrupt`] is called while the
    /// caller is parked.
    fn get(&self) -> Result<T, Interrupted>;

    /// Inserts `item` only if a slot is free right now.
    ///
    /// # Errors
    ///
    /// [`InsertError::Full`] if the buffer is full.
    fn add(&self, item: T) -> Result<(), InsertError<T>>;

    /// Removes the oldest item if there is one; `None` if the buffer is empty.
    fn remove(&self) -> Option<T>;

    /// Inserts `item`, parking the caller while the buffer is full but never
    /// past `deadline`.
    ///
    /// # Errors
    ///
    /// [`InsertError::Full`] if no slot freed up before `deadline`,
    /// [`InsertError::Interrupted`] if the wait was interrupted.
    fn offer(&self, item: T, deadline: Instant) -> Result<(), InsertError<T>>;

    /// Removes the oldest item, parking the caller while the buffer is empty
    /// but never past `deadline`. `Ok(None)` means the deadline passed.
    ///
    /// # Errors
    ///
    /// [`Interrupted`] if the wait was interrupted.
    fn poll(&self, deadline: Instant) -> Result<Option<T>, Interrupted>;

    /// Number of items currently stored.
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every call currently parked on this buffer give up and return
    /// its interruption error. Stored items are untouched and later calls
    /// behave normally.
    fn interrupt(&self);
}

/// Selects the synchronization strategy behind a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// [`MonitorBuffer`]
    #[default]
    Monitor,
    /// [`ConditionBuffer`]
    Condition,
    /// [`SemaphoreBuffer`]
    Semaphore,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Self::Monitor, Self::Condition, Self::Semaphore];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Condition => "condition",
            Self::Semaphore => "semaphore",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// Creates a buffer of `capacity` slots using `strategy`.
///
/// # Panics
///
/// Panics if `capacity` is 0.
///
/// # Examples
///
/// ```
/// use foundation_buffers::buffers::{new_buffer, Strategy};
///
/// let buffer = new_buffer::<u32>(2, Strategy::Semaphore);
/// assert!(buffer.add(1).is_ok());
/// assert_eq!(buffer.remove(), Some(1));
/// assert_eq!(buffer.remove(), None);
/// ```
#[must_use]
pub fn new_buffer<T>(capacity: usize, strategy: Strategy) -> Arc<dyn BoundedBuffer<T>>
where
    T: Send + 'static,
{
    tracing::debug!(capacity, %strategy, "creating bounded buffer");
    match strategy {
        Strategy::Monitor => Arc::new(MonitorBuffer::new(capacity)),
        Strategy::Condition => Arc::new(ConditionBuffer::new(capacity)),
        Strategy::Semaphore => Arc::new(SemaphoreBuffer::new(capacity)),
    }
}
