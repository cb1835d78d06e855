//! Pool and timed-pool configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default task queue capacity when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 255;

/// Default upper bound on a single timer-thread sleep, in milliseconds.
pub const DEFAULT_MAX_SLEEP_QUANTUM_MS: u64 = 100;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of dedicated worker threads.
    pub worker_count: usize,
    /// Maximum queued tasks before submissions are rejected.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with defaults (one worker per CPU).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the task queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a pool configuration from a JSON string and validate it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: PoolConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Configuration for a [`crate::core::TimedPool`]: pool settings plus the
/// timer thread's sleep bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedPoolConfig {
    /// Settings for the underlying worker pool.
    pub pool: PoolConfig,
    /// Upper bound on a single timer-thread sleep, in milliseconds. Guards
    /// against missed wakeups racing with schedule insertions.
    pub max_sleep_quantum_ms: u64,
}

impl Default for TimedPoolConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            max_sleep_quantum_ms: DEFAULT_MAX_SLEEP_QUANTUM_MS,
        }
    }
}

impl TimedPoolConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the underlying pool configuration.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the timer thread's maximum sleep quantum in milliseconds.
    #[must_use]
    pub fn with_max_sleep_quantum_ms(mut self, ms: u64) -> Self {
        self.max_sleep_quantum_ms = ms;
        self
    }

    /// The sleep quantum as a [`Duration`].
    pub fn max_sleep_quantum(&self) -> Duration {
        Duration::from_millis(self.max_sleep_quantum_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate()?;
        if self.max_sleep_quantum_ms == 0 {
            return Err("max_sleep_quantum_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a timed-pool configuration from a JSON string and validate it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: TimedPoolConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
