//! Core runtime components: task, queue, pool, scheduler.

pub mod error;
pub mod queue;
pub mod scheduler;
pub mod task;
pub mod timed_pool;
pub mod worker_pool;

pub use error::{AppResult, HandleError, PoolError, TaskError};
pub use queue::BoundedQueue;
pub use scheduler::Scheduler;
pub use task::{Task, TaskHandle};
pub use timed_pool::TimedPool;
pub use worker_pool::WorkerPool;
