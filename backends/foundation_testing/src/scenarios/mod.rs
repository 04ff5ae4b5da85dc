//! Common bounded buffer scenarios.
//!
//! Provides reusable runs of the classic patterns:
//! - Producer-consumer transfers and FIFO sequences
//! - Deadline accuracy of timed operations
//! - Interruption of parked callers

use core::fmt;

use foundation_buffers::Interrupted;

pub mod deadlines;
pub mod producer_consumer;

pub use deadlines::{interrupt_getters, offer_full, poll_empty, DeadlineMiss};
pub use producer_consumer::{fifo_sequence, transfer_all, Transfer};

pub type ScenarioResult<T> = core::result::Result<T, ScenarioError>;

#[derive(Debug, derive_more::From)]
pub enum ScenarioError {
    /// A blocking call was interrupted.
    Interrupted(Interrupted),

    #[from(ignore)]
    WorkerPanicked(&'static str),

    #[from(ignore)]
    Mismatch { expected: usize, received: usize },

    #[from(ignore)]
    Invalid(&'static str),

    #[from(ignore)]
    Unexpected(&'static str),
}

impl std::error::Error for ScenarioError {}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
