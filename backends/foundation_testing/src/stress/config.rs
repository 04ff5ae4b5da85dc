//! Stress test configuration.

use core::time::Duration;

use foundation_buffers::Strategy;

/// Configuration for buffer stress tests.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Producer threads to spawn
    producers: usize,
    /// Consumer threads to spawn
    consumers: usize,
    /// Values inserted by each producer
    iterations: usize,
    /// Buffer slots
    capacity: usize,
    strategy: Strategy,
    /// Optional time limit; workers stop early once it passes
    duration: Option<Duration>,
}

impl StressConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `producers`: 2
    /// - `consumers`: 2
    /// - `iterations`: 1000
    /// - `capacity`: 4
    /// - `strategy`: [`Strategy::Monitor`]
    /// - `duration`: None (no time limit)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            iterations: 1000,
            capacity: 4,
            strategy: Strategy::Monitor,
            duration: None,
        }
    }

    #[must_use]
    pub const fn producers(mut self, count: usize) -> Self {
        self.producers = count;
        self
    }

    #[must_use]
    pub const fn consumers(mut self, count: usize) -> Self {
        self.consumers = count;
        self
    }

    /// Sets the number of values each producer inserts.
    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the maximum duration for the test.
    ///
    /// Once it passes, workers stop and parked ones are interrupted.
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub const fn get_producers(&self) -> usize {
        self.producers
    }

    #[must_use]
    pub const fn get_consumers(&self) -> usize {
        self.consumers
    }

    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn get_capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn get_strategy(&self) -> Strategy {
        self.strategy
    }

    #[must_use]
    pub const fn get_duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Values the producers insert in total.
    #[must_use]
    pub const fn total_values(&self) -> usize {
        self.producers * self.iterations
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}
