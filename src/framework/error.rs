//! # Framework Errors
//!
//! Errors produced by the shared plumbing. Stages translate these into a clean
//! [`StageExit`](crate::framework::StageExit) rather than propagating them.

/// Errors that can occur within the pipeline plumbing itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    /// The run's interrupt latch fired while a task was blocked.
    #[error("Interrupted while waiting on {0}")]
    Interrupted(&'static str),

    /// A coordination primitive was closed underneath a waiter.
    #[error("Closed while waiting on {0}")]
    Closed(&'static str),
}
