//! Worker pool with deadline scheduling, under one lifecycle.
//!
//! [`TimedPool`] composes a [`WorkerPool`] with a [`Scheduler`] bound to it
//! and adds nothing beyond delegation. Start order matters: the pool comes up
//! before the scheduler so fired tasks have somewhere to land, and the
//! scheduler goes down first so no timer submission races the pool's
//! shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{PoolConfig, TimedPoolConfig};
use crate::core::error::PoolError;
use crate::core::scheduler::Scheduler;
use crate::core::task::{Task, TaskHandle};
use crate::core::worker_pool::WorkerPool;

/// A [`WorkerPool`] plus a [`Scheduler`], offering immediate, delayed, and
/// absolute-time submission.
pub struct TimedPool {
    pool: Arc<WorkerPool>,
    scheduler: Scheduler,
}

impl TimedPool {
    /// Create a stopped timed pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if validation fails.
    pub fn new(config: TimedPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        let max_sleep_quantum = config.max_sleep_quantum();
        let pool = Arc::new(WorkerPool::new(config.pool)?);
        let scheduler = Scheduler::new(Arc::clone(&pool)).with_max_sleep_quantum(max_sleep_quantum);
        Ok(Self { pool, scheduler })
    }

    /// Convenience constructor: `worker_count` threads, remaining defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `worker_count` is zero.
    pub fn with_workers(worker_count: usize) -> Result<Self, PoolError> {
        let config =
            TimedPoolConfig::new().with_pool(PoolConfig::new().with_worker_count(worker_count));
        Self::new(config)
    }

    /// Start the pool, then the scheduler.
    pub fn start(&self) {
        self.pool.start();
        self.scheduler.start();
    }

    /// Stop the scheduler, then the pool. Idempotent.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.pool.stop();
    }

    /// True only when both the scheduler and the pool are stopped.
    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_stopped() && self.pool.is_stopped()
    }

    /// Enqueue a pre-built task for immediate execution.
    ///
    /// Hands the task back if the queue is full.
    pub fn post(&self, task: Task) -> Result<(), Task> {
        self.pool.post(task)
    }

    /// Hand a pre-built task to the scheduler to run after `delay`.
    pub fn post_after(&self, task: Task, delay: Duration) {
        self.scheduler.schedule_after(delay, task);
    }

    /// Hand a pre-built task to the scheduler to run at `deadline`.
    pub fn post_at(&self, task: Task, deadline: Instant) {
        self.scheduler.schedule_at(deadline, task);
    }

    /// Submit `f` for immediate execution, returning its result handle.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::QueueFull`] if the queue rejected the task.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.pool.submit(f)
    }

    /// Submit `f` to run after `delay`, returning its result handle
    /// immediately.
    ///
    /// Deferred submission cannot be rejected: the vault is unbounded and the
    /// scheduler retries pool backpressure on its own.
    pub fn submit_after<F, R>(&self, f: F, delay: Duration) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit_at(f, Instant::now() + delay)
    }

    /// Submit `f` to run at `deadline`, returning its result handle
    /// immediately.
    pub fn submit_at<F, R>(&self, f: F, deadline: Instant) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut task = Task::new(f);
        let handle = match task.handle::<R>() {
            Ok(handle) => handle,
            Err(_) => unreachable!("fresh task yields a handle of its own result type"),
        };
        self.scheduler.schedule_at(deadline, task);
        handle
    }

    /// Configured number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Number of tasks currently executing across all workers.
    pub fn active_task_count(&self) -> usize {
        self.pool.active_task_count()
    }

    /// Number of tasks waiting in the pool's queue.
    pub fn queued_task_count(&self) -> usize {
        self.pool.queued_task_count()
    }

    /// Number of deferred tasks still waiting on their deadline.
    pub fn callback_count(&self) -> usize {
        self.scheduler.callback_count()
    }
}

impl Drop for TimedPool {
    fn drop(&mut self) {
        self.stop();
    }
}
