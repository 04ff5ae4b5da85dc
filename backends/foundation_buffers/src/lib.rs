//! Bounded buffers for producer/consumer threads.
//!
//! This crate provides:
//! - **Storage**: a fixed-capacity ring with raw, unsynchronized insert and
//!   remove primitives
//! - **Buffers**: the [`BoundedBuffer`] contract (blocking `put`/`get`,
//!   immediate `add`/`remove`, deadline-bounded `offer`/`poll`) implemented
//!   with a monitor, a split-condition monitor, and counting semaphores
//! - **Primitives**: condition variable re-exports and a counting [`Semaphore`]
//! - **Workloads**: a configurable producer/consumer driver and its TOML
//!   configuration
//!
//! # Examples
//!
//! ```rust
//! use foundation_buffers::{new_buffer, Strategy};
//! use std::thread;
//!
//! let buffer = new_buffer::<u32>(5, Strategy::Monitor);
//!
//! let producer = {
//!     let buffer = buffer.clone();
//!     thread::spawn(move || {
//!         for value in 1..=5 {
//!             buffer.put(value).unwrap();
//!         }
//!     })
//! };
//!
//! let received: Vec<u32> = (0..5).map(|_| buffer.get().unwrap()).collect();
//! producer.join().unwrap();
//!
//! assert_eq!(received, vec![1, 2, 3, 4, 5]);
//! ```
//!
//! [`Semaphore`]: primitives::Semaphore

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffers;
pub mod config;
pub mod errors;
pub mod primitives;
pub mod storage;
pub mod workload;

// Re-export commonly used items
pub use buffers::{
    new_buffer, BoundedBuffer, ConditionBuffer, MonitorBuffer, SemaphoreBuffer, Strategy,
};
pub use config::{BufferConfig, Mode};
pub use errors::{ConfigError, InsertError, Interrupted, WorkloadError};
pub use workload::{Workload, WorkloadReport};
