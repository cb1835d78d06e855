//! Error types for pool, task, and result-handle operations.

use thiserror::Error;

/// Errors surfaced when submitting work to a [`crate::core::WorkerPool`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The task queue is at capacity; the submission was rejected.
    #[error("task queue is full")]
    QueueFull,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced when requesting a typed result handle from a task.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The requested result type does not match the type the task produces.
    #[error("result handle requested with wrong type")]
    WrongResultType,
    /// The task carries no result handle, or it was already taken.
    #[error("no result handle available")]
    NoResult,
}

/// Failures delivered through a task's result channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task body panicked; the payload is captured as a message.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was discarded before it ever ran (e.g. pool destroyed while
    /// the task was still queued).
    #[error("task was dropped before it ran")]
    Cancelled,
    /// The wait deadline elapsed before the result arrived.
    #[error("timed out waiting for task result")]
    Timeout,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
