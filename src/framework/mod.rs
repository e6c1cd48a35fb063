//! Generic pipeline plumbing shared by every stage.
//!
//! # Main Components
//!
//! - [`WorkQueue`] - Async FIFO connecting producers and consumers
//! - [`KeyedQueue`] - FIFO that can also hand out an entry by key
//! - [`Latch`] / [`LatchSetter`] - Set-once flags with a single writer
//! - [`StageExit`] - How a long-lived stage finished
//! - [`FrameworkError`] - Errors raised by blocking waits

pub mod error;
pub mod keyed_queue;
pub mod latch;
pub mod queue;

pub use error::FrameworkError;
pub use keyed_queue::{Keyed, KeyedQueue};
pub use latch::{latch, Latch, LatchGuard, LatchSetter};
pub use queue::WorkQueue;

use serde::Serialize;
use std::fmt;

/// How a long-lived stage left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageExit {
    /// The stage ran its work to completion.
    Completed,
    /// The stage observed the shutdown condition and stopped without finishing.
    Shutdown,
    /// The run's interrupt latch fired.
    Cancelled,
}

impl fmt::Display for StageExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageExit::Completed => "completed",
            StageExit::Shutdown => "shutdown",
            StageExit::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
