//! Deadline accuracy of `offer` and `poll`.

use core::time::Duration;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use foundation_buffers::{BoundedBuffer, Interrupted};

use crate::scenarios::{ScenarioError, ScenarioResult};

/// How a timed call returned relative to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineMiss {
    /// Returned before the deadline (always a defect).
    pub early: bool,
    /// Time past the deadline when the call returned.
    pub overshoot: Duration,
}

impl DeadlineMiss {
    fn measure(deadline: Instant) -> Self {
        let now = Instant::now();
        Self {
            early: now < deadline,
            overshoot: now.saturating_duration_since(deadline),
        }
    }
}

/// Polls an empty buffer with a deadline `timeout` away.
///
/// # Errors
///
/// [`ScenarioError::Invalid`] if the buffer is not empty,
/// [`ScenarioError::Interrupted`] if the poll was interrupted, and
/// [`ScenarioError::Unexpected`] if a value arrived.
pub fn poll_empty(
    buffer: &Arc<dyn BoundedBuffer<u64>>,
    timeout: Duration,
) -> ScenarioResult<DeadlineMiss> {
    if !buffer.is_empty() {
        return Err(ScenarioError::Invalid("poll_empty needs an empty buffer"));
    }

    let deadline = Instant::now() + timeout;
    match buffer.poll(deadline)? {
        None => Ok(DeadlineMiss::measure(deadline)),
        Some(_) => Err(ScenarioError::Unexpected("poll received a value")),
    }
}

/// Fills the buffer, then offers one more value with a deadline `timeout`
/// away. The buffer is left full.
///
/// # Errors
///
/// [`ScenarioError::Interrupted`] if the offer was interrupted and
/// [`ScenarioError::Unexpected`] if it (or a fill) did not see the buffer as
/// full.
pub fn offer_full(
    buffer: &Arc<dyn BoundedBuffer<u64>>,
    timeout: Duration,
) -> ScenarioResult<DeadlineMiss> {
    let mut value = 0;
    while buffer.len() < buffer.capacity() {
        buffer
            .add(value)
            .map_err(|_| ScenarioError::Unexpected("fill rejected below capacity"))?;
        value += 1;
    }

    let deadline = Instant::now() + timeout;
    match buffer.offer(value, deadline) {
        Err(err) if err.is_full() => Ok(DeadlineMiss::measure(deadline)),
        Err(_) => Err(ScenarioError::Interrupted(Interrupted)),
        Ok(()) => Err(ScenarioError::Unexpected("offer inserted into a full buffer")),
    }
}

/// Parks `waiters` threads in `get` on an empty buffer, interrupts it after
/// `settle`, and returns how many were released with an interruption.
///
/// # Errors
///
/// [`ScenarioError::WorkerPanicked`] if a waiter panicked and
/// [`ScenarioError::Unexpected`] if a waiter received a value.
pub fn interrupt_getters(
    buffer: &Arc<dyn BoundedBuffer<u64>>,
    waiters: usize,
    settle: Duration,
) -> ScenarioResult<usize> {
    let handles: Vec<_> = (0..waiters)
        .map(|_| {
            let buffer = Arc::clone(buffer);
            thread::spawn(move || buffer.get())
        })
        .collect();

    thread::sleep(settle);
    buffer.interrupt();

    let mut released = 0;
    for handle in handles {
        match handle.join() {
            Ok(Err(_)) => released += 1,
            Ok(Ok(_)) => return Err(ScenarioError::Unexpected("parked get received a value")),
            Err(_) => return Err(ScenarioError::WorkerPanicked("getter")),
        }
    }

    tracing::debug!(waiters, released, "interrupted parked getters");
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation_buffers::{new_buffer, Strategy};
    use serial_test::serial;

    /// WHY: A timed poll must never give up early
    /// WHAT: poll on an empty buffer returns at or after its deadline
    #[test]
    #[serial]
    fn test_poll_empty_not_early() {
        for strategy in Strategy::ALL {
            let buffer = new_buffer(2, strategy);
            let miss = poll_empty(&buffer, Duration::from_millis(30)).unwrap();
            assert!(!miss.early, "{strategy}");
        }
    }

    /// WHY: A full buffer must stay full through a timed-out offer
    /// WHAT: offer_full times out and leaves exactly `capacity` items
    #[test]
    #[serial]
    fn test_offer_full_not_early() {
        for strategy in Strategy::ALL {
            let buffer = new_buffer(3, strategy);
            let miss = offer_full(&buffer, Duration::from_millis(30)).unwrap();
            assert!(!miss.early, "{strategy}");
            assert_eq!(buffer.len(), 3, "{strategy}");
        }
    }

    #[test]
    fn test_poll_empty_requires_empty_buffer() {
        let buffer = new_buffer(1, Strategy::Monitor);
        buffer.add(1).unwrap();
        assert!(matches!(
            poll_empty(&buffer, Duration::ZERO),
            Err(ScenarioError::Invalid(_))
        ));
    }

    /// WHY: Interruption is the only way out of a get on a buffer nobody feeds
    /// WHAT: Every parked getter is released for each strategy
    #[test]
    #[ntest::timeout(10000)]
    fn test_interrupt_getters_releases_all() {
        for strategy in Strategy::ALL {
            let buffer = new_buffer(1, strategy);
            let released = interrupt_getters(&buffer, 4, Duration::from_millis(50)).unwrap();
            assert_eq!(released, 4, "{strategy}");
        }
    }
}
