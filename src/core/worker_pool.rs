//! Worker pool with dedicated OS threads.
//!
//! A [`WorkerPool`] owns a [`BoundedQueue`] of tasks and a fixed set of worker
//! threads that pop and invoke them. The pool starts out stopped; `start`
//! spawns the workers and `stop` joins them, and the cycle may repeat any
//! number of times. Submission never blocks: a full queue rejects the task and
//! the caller decides whether to retry, drop, or escalate.
//!
//! Workers use the queue's halt signal as their shutdown wakeup: `stop` raises
//! a per-generation cooperative stop flag, halts the queue to unpark any
//! worker waiting in `try_pop`, and joins every thread. Task panics are
//! contained inside [`Task::run`], so a faulting task can never terminate its
//! worker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::queue::BoundedQueue;
use crate::core::task::{Task, TaskHandle};

/// Fixed-size pool of worker threads draining a bounded task queue.
pub struct WorkerPool {
    worker_count: usize,
    /// Lifecycle flag, true from construction and between stop/start cycles.
    stopped: AtomicBool,
    /// Number of tasks currently mid-invocation across all workers.
    active_tasks: Arc<AtomicUsize>,
    queue: Arc<BoundedQueue<Task>>,
    /// Cooperative stop flag for the current worker generation. Replaced on
    /// every `start` so a late signal cannot leak into the next cycle.
    stop_flag: Mutex<Arc<AtomicBool>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a stopped pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if validation fails.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        Ok(Self {
            worker_count: config.worker_count,
            stopped: AtomicBool::new(true),
            active_tasks: Arc::new(AtomicUsize::new(0)),
            queue: Arc::new(BoundedQueue::new(config.queue_capacity)),
            stop_flag: Mutex::new(Arc::new(AtomicBool::new(false))),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Convenience constructor: `worker_count` threads, default queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `worker_count` is zero.
    pub fn with_workers(worker_count: usize) -> Result<Self, PoolError> {
        Self::new(PoolConfig::new().with_worker_count(worker_count))
    }

    /// Enqueue a pre-built task without blocking.
    ///
    /// Hands the task back on a full queue. Posting into a stopped pool is
    /// allowed: the task waits in the queue and runs after the next `start`.
    pub fn post(&self, task: Task) -> Result<(), Task> {
        self.queue.try_push(task)
    }

    /// Wrap `f` into a task, post it, and return the typed result handle.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::QueueFull`] if the queue rejected the task; the
    /// task is dropped and no side effects remain.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut task = Task::new(f);
        let handle = match task.handle::<R>() {
            Ok(handle) => handle,
            Err(_) => unreachable!("fresh task yields a handle of its own result type"),
        };
        if self.queue.try_push(task).is_err() {
            warn!("task queue is full, submission rejected");
            return Err(PoolError::QueueFull);
        }
        Ok(handle)
    }

    /// Spawn the worker threads. No-op if the pool is already running.
    ///
    /// Not safe to call concurrently with [`WorkerPool::stop`]; the caller
    /// owns that serialization.
    pub fn start(&self) {
        if !self.stopped.swap(false, Ordering::AcqRel) {
            return;
        }
        self.queue.resume();
        let stop_flag = Arc::new(AtomicBool::new(false));
        *self.stop_flag.lock() = Arc::clone(&stop_flag);

        let mut workers = self.workers.lock();
        for worker_id in 0..self.worker_count {
            workers.push(spawn_worker(
                worker_id,
                Arc::clone(&self.queue),
                Arc::clone(&self.active_tasks),
                Arc::clone(&stop_flag),
            ));
        }
        info!(worker_count = self.worker_count, "worker pool started");
    }

    /// Signal every worker, unblock waiters, and join the threads.
    ///
    /// Idempotent: calling `stop` on a stopped pool does nothing. Tasks still
    /// queued when the workers exit stay in the queue and run after the next
    /// `start`; tasks mid-invocation run to completion first.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_flag.lock().store(true, Ordering::Release);
        self.queue.halt();

        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock();
            guard.drain(..).collect()
        };
        for worker in workers {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        info!("worker pool stopped");
    }

    /// Whether the pool is currently stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Number of tasks currently executing across all workers.
    pub fn active_task_count(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// Configured number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_task_count(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_worker(
    worker_id: usize,
    queue: Arc<BoundedQueue<Task>>,
    active_tasks: Arc<AtomicUsize>,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("chronopool-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            while !stop_flag.load(Ordering::Acquire) {
                // Blocks while the queue is empty and running; returns None
                // once the queue is halted, letting the stop check decide.
                let Some(task) = queue.try_pop() else {
                    continue;
                };
                active_tasks.fetch_add(1, Ordering::AcqRel);
                task.run();
                active_tasks.fetch_sub(1, Ordering::AcqRel);
            }
            debug!(worker_id, "worker thread exiting");
        })
        .expect("failed to spawn worker thread")
}
