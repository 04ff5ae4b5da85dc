//! Producer-consumer transfers through any bounded buffer.

use std::sync::Arc;
use std::thread;

use foundation_buffers::{BoundedBuffer, Interrupted};

use crate::scenarios::{ScenarioError, ScenarioResult};

/// Values received by the consumers of one transfer, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub received: Vec<u64>,
    /// Largest `len()` seen by a producer right after a `put`.
    pub max_len_seen: usize,
}

/// Moves `producers * per_producer` distinct values through `buffer` with
/// blocking `put` / `get`, then checks that each arrived exactly once.
///
/// Consumers split the values as evenly as possible; the first
/// `total % consumers` take one extra.
///
/// # Examples
///
/// ```
/// use foundation_buffers::{new_buffer, Strategy};
/// use foundation_testing::scenarios::transfer_all;
///
/// let buffer = new_buffer(2, Strategy::Condition);
/// let transfer = transfer_all(&buffer, 3, 2, 50).unwrap();
///
/// assert_eq!(transfer.received, (0..150).collect::<Vec<u64>>());
/// ```
///
/// # Errors
///
/// [`ScenarioError::WorkerPanicked`] if a thread panicked,
/// [`ScenarioError::Interrupted`] if the buffer was interrupted, and
/// [`ScenarioError::Mismatch`] if values were lost or duplicated.
pub fn transfer_all(
    buffer: &Arc<dyn BoundedBuffer<u64>>,
    producers: usize,
    consumers: usize,
    per_producer: usize,
) -> ScenarioResult<Transfer> {
    let total = producers * per_producer;
    if consumers == 0 && total > 0 {
        return Err(ScenarioError::Invalid("values need at least one consumer"));
    }

    let producer_handles: Vec<_> = (0..producers)
        .map(|producer_id| {
            let buffer = Arc::clone(buffer);
            thread::spawn(move || {
                let mut max_len_seen = 0;
                let first = (producer_id * per_producer) as u64;
                for value in first..first + per_producer as u64 {
                    buffer.put(value).map_err(|_| ScenarioError::Interrupted(Interrupted))?;
                    max_len_seen = max_len_seen.max(buffer.len());
                }
                Ok::<_, ScenarioError>(max_len_seen)
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|consumer_id| {
            let buffer = Arc::clone(buffer);
            let share = total / consumers + usize::from(consumer_id < total % consumers);
            thread::spawn(move || {
                let mut received = Vec::with_capacity(share);
                for _ in 0..share {
                    received.push(buffer.get()?);
                }
                Ok::<_, ScenarioError>(received)
            })
        })
        .collect();

    let mut max_len_seen = 0;
    for handle in producer_handles {
        let seen: usize = join("producer", handle)??;
        max_len_seen = max_len_seen.max(seen);
    }

    let mut received = Vec::with_capacity(total);
    for handle in consumer_handles {
        let values: Vec<u64> = join("consumer", handle)??;
        received.extend(values);
    }
    received.sort_unstable();

    let expected: Vec<u64> = (0..total as u64).collect();
    if received != expected {
        return Err(ScenarioError::Mismatch {
            expected: total,
            received: received.len(),
        });
    }

    tracing::debug!(total, max_len_seen, "transfer complete");
    Ok(Transfer {
        received,
        max_len_seen,
    })
}

/// One producer inserts `0..count` while one consumer removes; returns the
/// values in the order they were received.
///
/// # Errors
///
/// Same as [`transfer_all`], except that the order is returned as-is rather
/// than checked.
pub fn fifo_sequence(
    buffer: &Arc<dyn BoundedBuffer<u64>>,
    count: u64,
) -> ScenarioResult<Vec<u64>> {
    let producer = {
        let buffer = Arc::clone(buffer);
        thread::spawn(move || {
            for value in 0..count {
                buffer.put(value).map_err(|_| ScenarioError::Interrupted(Interrupted))?;
            }
            Ok::<_, ScenarioError>(())
        })
    };

    let mut received = Vec::new();
    for _ in 0..count {
        received.push(buffer.get()?);
    }
    join("producer", producer)??;

    Ok(received)
}

fn join<T>(role: &'static str, handle: thread::JoinHandle<T>) -> ScenarioResult<T> {
    handle
        .join()
        .map_err(|_| ScenarioError::WorkerPanicked(role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation_buffers::{new_buffer, Strategy};

    /// WHY: Uneven splits must still hand every value to some consumer
    /// WHAT: 7 values across 3 consumers all arrive
    #[test]
    #[ntest::timeout(10000)]
    fn test_uneven_consumer_split() {
        let buffer = new_buffer(1, Strategy::Semaphore);
        let transfer = transfer_all(&buffer, 1, 3, 7).unwrap();
        assert_eq!(transfer.received, (0..7).collect::<Vec<_>>());
        assert!(transfer.max_len_seen <= 1);
    }

    /// WHY: Values without consumers would block producers forever
    /// WHAT: Zero consumers is rejected before spawning
    #[test]
    fn test_no_consumers_rejected() {
        let buffer = new_buffer(1, Strategy::Monitor);
        assert!(matches!(
            transfer_all(&buffer, 1, 0, 1),
            Err(ScenarioError::Invalid(_))
        ));
    }

    #[test]
    #[ntest::timeout(10000)]
    fn test_fifo_sequence() {
        let buffer = new_buffer(3, Strategy::Condition);
        assert_eq!(fifo_sequence(&buffer, 100).unwrap(), (0..100).collect::<Vec<_>>());
    }
}
