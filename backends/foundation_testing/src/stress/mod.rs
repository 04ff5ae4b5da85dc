//! Stress test framework for bounded buffers.
//!
//! Provides configurable high-contention testing with:
//! - Producer and consumer thread counts
//! - Buffer capacity and strategy selection
//! - Optional time limit with interruption of parked workers
//! - Retry and latency tracking

use core::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use foundation_buffers::{new_buffer, BoundedBuffer, InsertError, Interrupted};

use crate::metrics::Metrics;

pub mod buffer;
pub mod config;

pub use buffer::{run_blocking_stress, run_mixed_stress, run_nonblocking_stress, run_timed_stress};
pub use config::StressConfig;

/// Buffer shared by every worker of a run.
pub type StressBuffer = Arc<dyn BoundedBuffer<u64>>;

// How often the joiner checks the time limit and nudges parked workers.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Values inserted
    pub produced: usize,
    /// Values removed
    pub consumed: usize,
    /// Attempts that found the buffer full or empty, or whose deadline expired
    pub retries: usize,
    /// Sum of inserted values
    pub produced_sum: u64,
    /// Sum of removed values
    pub consumed_sum: u64,
    /// Largest `len()` any producer observed right after inserting
    pub max_len_seen: usize,
    /// The time limit passed before every value went through
    pub stopped_early: bool,
    pub metrics: Metrics,
}

impl StressResult {
    /// Every inserted value was removed, and nothing else was.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.produced == self.consumed && self.produced_sum == self.consumed_sum
    }

    /// Share of attempts that succeeded, between 0.0 and 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let successes = self.produced + self.consumed;
        let attempts = successes + self.retries;
        if attempts == 0 {
            0.0
        } else {
            successes as f64 / attempts as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    produced: AtomicUsize,
    consumed: AtomicUsize,
    retries: AtomicUsize,
    produced_sum: AtomicU64,
    consumed_sum: AtomicU64,
    max_len_seen: AtomicUsize,
}

/// Runs producer and consumer closures against one buffer.
///
/// Producers insert `iterations` distinct values each. Consumers claim values
/// from a shared countdown so that, without a time limit, the run ends once
/// every value has gone through the buffer. A failed attempt is retried with
/// the same value until it succeeds, the operation is interrupted, or the
/// time limit passes.
pub struct StressHarness {
    config: StressConfig,
    buffer: StressBuffer,
}

impl StressHarness {
    /// Creates a harness over a fresh buffer built from `config`.
    ///
    /// # Panics
    ///
    /// Panics if the configured capacity is 0.
    #[must_use]
    pub fn new(config: StressConfig) -> Self {
        let buffer = new_buffer(config.get_capacity(), config.get_strategy());
        Self::with_buffer(config, buffer)
    }

    /// Creates a harness over an existing buffer; the configured capacity and
    /// strategy are ignored.
    #[must_use]
    pub fn with_buffer(config: StressConfig, buffer: StressBuffer) -> Self {
        Self { config, buffer }
    }

    #[must_use]
    pub fn buffer(&self) -> StressBuffer {
        Arc::clone(&self.buffer)
    }

    /// Runs the stress test.
    ///
    /// `produce` is called with the buffer and the value to insert. `consume`
    /// is called with the buffer and returns `Ok(None)` when nothing was
    /// removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_testing::stress::{StressConfig, StressHarness};
    ///
    /// let config = StressConfig::new().producers(3).consumers(2).iterations(100);
    /// let result = StressHarness::new(config).run(
    ///     |buffer, value| buffer.put(value),
    ///     |buffer| buffer.get().map(Some),
    /// );
    ///
    /// assert_eq!(result.produced, 300);
    /// assert!(result.is_balanced());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if any worker thread panics during the stress test execution.
    pub fn run<P, C>(self, produce: P, consume: C) -> StressResult
    where
        P: Fn(&dyn BoundedBuffer<u64>, u64) -> Result<(), InsertError<u64>> + Send + Sync + 'static,
        C: Fn(&dyn BoundedBuffer<u64>) -> Result<Option<u64>, Interrupted> + Send + Sync + 'static,
    {
        let config = self.config;
        tracing::debug!(?config, "starting buffer stress run");

        let start = Instant::now();
        let deadline = config.get_duration().map(|duration| start + duration);
        let produce = Arc::new(produce);
        let consume = Arc::new(consume);
        let counters = Arc::new(Counters::default());
        let stop_flag = Arc::new(AtomicBool::new(false));
        let remaining = Arc::new(AtomicUsize::new(config.total_values()));

        let mut handles = Vec::with_capacity(config.get_producers() + config.get_consumers());

        for thread_id in 0..config.get_producers() {
            let buffer = self.buffer();
            let produce = Arc::clone(&produce);
            let counters = Arc::clone(&counters);
            let stop_flag = Arc::clone(&stop_flag);
            let iterations = config.get_iterations();

            handles.push(thread::spawn(move || {
                let mut latencies = Vec::with_capacity(iterations);
                let first = (thread_id * iterations) as u64;

                'values: for mut value in first..first + iterations as u64 {
                    loop {
                        if stop_flag.load(Ordering::Acquire) {
                            break 'values;
                        }

                        let started = Instant::now();
                        match produce(&*buffer, value) {
                            Ok(()) => {
                                latencies.push(elapsed_nanos(started));
                                counters.produced.fetch_add(1, Ordering::Relaxed);
                                counters.produced_sum.fetch_add(value, Ordering::Relaxed);
                                counters.max_len_seen.fetch_max(buffer.len(), Ordering::Relaxed);
                                break;
                            }
                            Err(InsertError::Full(rejected)) => {
                                counters.retries.fetch_add(1, Ordering::Relaxed);
                                value = rejected;
                                thread::yield_now();
                            }
                            Err(InsertError::Interrupted(_)) => break 'values,
                        }
                    }
                }
                latencies
            }));
        }

        for _ in 0..config.get_consumers() {
            let buffer = self.buffer();
            let consume = Arc::clone(&consume);
            let counters = Arc::clone(&counters);
            let stop_flag = Arc::clone(&stop_flag);
            let remaining = Arc::clone(&remaining);

            handles.push(thread::spawn(move || {
                let mut latencies = vec![];

                'claims: while remaining
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
                    .is_ok()
                {
                    loop {
                        if stop_flag.load(Ordering::Acquire) {
                            break 'claims;
                        }

                        let started = Instant::now();
                        match consume(&*buffer) {
                            Ok(Some(value)) => {
                                latencies.push(elapsed_nanos(started));
                                counters.consumed.fetch_add(1, Ordering::Relaxed);
                                counters.consumed_sum.fetch_add(value, Ordering::Relaxed);
                                break;
                            }
                            Ok(None) => {
                                counters.retries.fetch_add(1, Ordering::Relaxed);
                                thread::yield_now();
                            }
                            Err(Interrupted) => break 'claims,
                        }
                    }
                }
                latencies
            }));
        }

        let samples = self.join_workers(handles, deadline, &stop_flag);
        let duration = start.elapsed();

        let produced = counters.produced.load(Ordering::Relaxed);
        let consumed = counters.consumed.load(Ordering::Relaxed);
        let result = StressResult {
            produced,
            consumed,
            retries: counters.retries.load(Ordering::Relaxed),
            produced_sum: counters.produced_sum.load(Ordering::Relaxed),
            consumed_sum: counters.consumed_sum.load(Ordering::Relaxed),
            max_len_seen: counters.max_len_seen.load(Ordering::Relaxed),
            stopped_early: stop_flag.load(Ordering::Acquire),
            metrics: Metrics::new(produced + consumed, duration, samples),
        };

        tracing::debug!(
            produced = result.produced,
            consumed = result.consumed,
            retries = result.retries,
            stopped_early = result.stopped_early,
            "buffer stress run finished"
        );
        result
    }

    // Joins every worker, enforcing the time limit on the way.
    fn join_workers(
        &self,
        handles: Vec<JoinHandle<Vec<u64>>>,
        deadline: Option<Instant>,
        stop_flag: &AtomicBool,
    ) -> Vec<u64> {
        let mut samples = vec![];

        for handle in handles {
            while !handle.is_finished() {
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    stop_flag.store(true, Ordering::Release);
                }
                if stop_flag.load(Ordering::Acquire) {
                    self.buffer.interrupt();
                }
                thread::park_timeout(JOIN_POLL);
            }

            samples.extend(handle.join().expect("Thread panicked during stress test"));
        }

        samples
    }
}

fn elapsed_nanos(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation_buffers::Strategy;
    use tracing_test::traced_test;

    /// WHY: The harness must see every value through exactly once
    /// WHAT: Blocking put/get balances for each strategy
    #[test]
    #[ntest::timeout(20000)]
    fn test_blocking_run_balances() {
        for strategy in Strategy::ALL {
            let config = StressConfig::new()
                .producers(3)
                .consumers(2)
                .iterations(200)
                .capacity(2)
                .strategy(strategy);

            let result = StressHarness::new(config).run(
                |buffer, value| buffer.put(value),
                |buffer| buffer.get().map(Some),
            );

            assert_eq!(result.produced, 600, "{strategy}");
            assert!(result.is_balanced(), "{strategy}");
            assert!(result.max_len_seen <= 2, "{strategy}");
            assert!(!result.stopped_early, "{strategy}");
            assert_eq!(result.retries, 0, "{strategy}");
        }
    }

    /// WHY: Runs are traced so a stalled stress test can be diagnosed from its logs
    /// WHAT: A run logs its start and its final counts
    #[test]
    #[traced_test]
    fn test_run_is_traced() {
        let config = StressConfig::new().producers(1).consumers(1).iterations(10);

        let result = StressHarness::new(config).run(
            |buffer, value| buffer.put(value),
            |buffer| buffer.get().map(Some),
        );

        assert!(result.is_balanced());
        assert!(logs_contain("starting buffer stress run"));
        assert!(logs_contain("buffer stress run finished"));
        assert!(logs_contain("produced=10"));
    }

    /// WHY: Producers blocked on a full buffer must not outlive the time limit
    /// WHAT: With no consumers the run stops early once the limit passes
    #[test]
    #[ntest::timeout(10000)]
    fn test_duration_stops_blocked_producers() {
        let config = StressConfig::new()
            .producers(2)
            .consumers(0)
            .capacity(3)
            .iterations(100)
            .duration(Duration::from_millis(50));

        let result = StressHarness::new(config).run(
            |buffer, value| buffer.put(value),
            |buffer| buffer.get().map(Some),
        );

        assert!(result.stopped_early);
        assert_eq!(result.produced, 3);
        assert_eq!(result.consumed, 0);
    }

    #[test]
    fn test_success_rate() {
        let result = StressResult {
            produced: 3,
            consumed: 3,
            retries: 2,
            produced_sum: 6,
            consumed_sum: 6,
            max_len_seen: 1,
            stopped_early: false,
            metrics: Metrics::new(6, Duration::from_millis(1), vec![]),
        };
        assert!((result.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!(result.is_balanced());
    }
}
