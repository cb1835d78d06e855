//! # Chronopool
//!
//! A timed worker-pool runtime: a fixed set of dedicated OS worker threads
//! draining a bounded task queue, plus a timer-driven scheduler that defers
//! submission of work until a chosen point in time.
//!
//! ## Components
//!
//! - [`core::Task`]: type-erased unit of work with a one-shot result channel
//!   that captures panics instead of propagating them into the worker.
//! - [`core::BoundedQueue`]: fixed-capacity ring buffer with blocking and
//!   non-blocking pops and a cooperative halt signal for shutdown.
//! - [`core::WorkerPool`]: owns the worker threads and the queue; supports
//!   repeatable start/stop cycles and never blocks on submission.
//! - [`core::Scheduler`]: one timer thread and a deadline-ordered vault;
//!   wakes exactly when needed, retries pool backpressure, never drops a
//!   scheduled task.
//! - [`core::TimedPool`]: pool + scheduler under a single lifecycle with
//!   immediate, delayed, and absolute-time submission.
//!
//! ## Example
//!
//! ```
//! use chronopool::core::TimedPool;
//! use std::time::Duration;
//!
//! let pool = TimedPool::with_workers(2).unwrap();
//! pool.start();
//!
//! let now = pool.submit(|| 2 + 2).unwrap();
//! let later = pool.submit_after(|| "deferred", Duration::from_millis(10));
//!
//! assert_eq!(now.wait(), Ok(4));
//! assert_eq!(later.wait(), Ok("deferred"));
//! pool.stop();
//! ```
//!
//! ## Guarantees
//!
//! - Immediate submissions reach workers in FIFO order relative to each
//!   other; deferred submissions reach the queue in non-decreasing deadline
//!   order, FIFO among equal deadlines. The two paths are not ordered against
//!   each other.
//! - A full queue rejects the submission and hands it back (backpressure);
//!   nothing in this crate blocks a producer.
//! - A task that panics delivers the failure through its own result handle;
//!   its worker thread keeps running.
//! - A task discarded unexecuted reports a cancelled result instead of
//!   leaving its waiter hanging.

/// Core runtime components: task, queue, pool, scheduler.
pub mod core;
/// Configuration models for pools and the scheduler timer.
pub mod config;
/// Shared utilities.
pub mod util;
