//! Reusable stress testing infrastructure for Foundation bounded buffers.
//!
//! This crate provides:
//! - **Stress test framework**: Configurable high-contention producer/consumer runs
//! - **Common scenarios**: Transfers, FIFO sequences, deadline accuracy, interruption
//! - **Performance metrics**: Latency percentiles and throughput
//! - **Criterion benchmarks**: Comparative performance of the buffer strategies
//!
//! # Examples
//!
//! ```rust
//! use foundation_buffers::Strategy;
//! use foundation_testing::stress::{StressConfig, StressHarness};
//!
//! let config = StressConfig::new()
//!     .producers(4)
//!     .consumers(2)
//!     .iterations(500)
//!     .strategy(Strategy::Semaphore);
//!
//! let harness = StressHarness::new(config);
//! let results = harness.run(
//!     |buffer, value| buffer.add(value),
//!     |buffer| Ok(buffer.remove()),
//! );
//!
//! assert_eq!(results.produced, 2000); // 4 producers * 500 values
//! assert!(results.is_balanced());
//! assert!(results.max_len_seen <= 4);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Common for testing crates

pub mod metrics;
pub mod scenarios;
pub mod stress;

// Re-export commonly used items
pub use metrics::{LatencySummary, Metrics};
pub use scenarios::{ScenarioError, ScenarioResult};
pub use stress::{StressConfig, StressHarness, StressResult};
