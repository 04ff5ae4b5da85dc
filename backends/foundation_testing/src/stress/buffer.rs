//! Ready-made stress runs, one per operation family.

use core::time::Duration;
use std::time::Instant;

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Runs a stress test with blocking `put` / `get`.
///
/// # Examples
///
/// ```
/// use foundation_buffers::Strategy;
/// use foundation_testing::stress::{run_blocking_stress, StressConfig};
///
/// let config = StressConfig::new().producers(4).consumers(4).strategy(Strategy::Semaphore);
/// let result = run_blocking_stress(config);
///
/// assert!(result.is_balanced());
/// ```
#[must_use]
pub fn run_blocking_stress(config: StressConfig) -> StressResult {
    StressHarness::new(config).run(
        |buffer, value| buffer.put(value),
        |buffer| buffer.get().map(Some),
    )
}

/// Runs a stress test with immediate `add` / `remove`, retrying on full and
/// empty.
#[must_use]
pub fn run_nonblocking_stress(config: StressConfig) -> StressResult {
    StressHarness::new(config).run(
        |buffer, value| buffer.add(value),
        |buffer| Ok(buffer.remove()),
    )
}

/// Runs a stress test with `offer` / `poll`, each attempt bounded by
/// `timeout`.
#[must_use]
pub fn run_timed_stress(config: StressConfig, timeout: Duration) -> StressResult {
    StressHarness::new(config).run(
        move |buffer, value| buffer.offer(value, Instant::now() + timeout),
        move |buffer| buffer.poll(Instant::now() + timeout),
    )
}

/// Runs a stress test where each value picks its operation family from the
/// value itself, so blocking, immediate and timed calls interleave on the
/// same buffer.
#[must_use]
pub fn run_mixed_stress(config: StressConfig) -> StressResult {
    const TIMEOUT: Duration = Duration::from_millis(2);

    StressHarness::new(config).run(
        |buffer, value| match value % 3 {
            0 => buffer.put(value),
            1 => buffer.add(value),
            _ => buffer.offer(value, Instant::now() + TIMEOUT),
        },
        |buffer| match buffer.len() % 3 {
            0 => buffer.poll(Instant::now() + TIMEOUT),
            1 => Ok(buffer.remove()),
            _ => buffer.get().map(Some),
        },
    )
}
