//! Configuration models for pools and the scheduler timer.

pub mod pool;

pub use pool::{
    PoolConfig, TimedPoolConfig, DEFAULT_MAX_SLEEP_QUANTUM_MS, DEFAULT_QUEUE_CAPACITY,
};
