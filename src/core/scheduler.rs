//! Timer-driven deferred submission into a worker pool.
//!
//! The [`Scheduler`] keeps not-yet-due tasks in a vault ordered by
//! `(deadline, insertion sequence)` and runs one background timer thread that
//! moves tasks into the bound pool's queue when their deadline arrives. The
//! sequence counter gives a deterministic FIFO among equal deadlines.
//!
//! The timer never busy-polls: it waits on a condition variable until the
//! earliest deadline, bounded by a maximum sleep quantum that guards against
//! a wakeup racing with a concurrent insertion. A submission rejected by the
//! pool (queue full, or pool stopped) ends the current pass; the entry stays
//! in the vault and is retried on the next wake, so a scheduled task is never
//! dropped silently.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_SLEEP_QUANTUM_MS;
use crate::core::task::Task;
use crate::core::worker_pool::WorkerPool;

/// Time-ordered store of deferred tasks. Guarded by the scheduler's mutex.
struct Vault {
    /// Keyed by `(deadline, sequence)`; the sequence breaks deadline ties in
    /// insertion order.
    entries: BTreeMap<(Instant, u64), Task>,
    next_seq: u64,
}

impl Vault {
    fn insert(&mut self, deadline: Instant, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((deadline, seq), task);
    }
}

/// State shared between the scheduler handle and its timer thread.
struct Shared {
    pool: Arc<WorkerPool>,
    vault: Mutex<Vault>,
    waiter: Condvar,
    stop: AtomicBool,
}

impl Shared {
    /// Hand `task` to the pool. A stopped pool counts as a transient
    /// rejection, same as a full queue: the task comes back to the caller.
    fn submit_to_pool(&self, task: Task) -> Result<(), Task> {
        if self.pool.is_stopped() {
            return Err(task);
        }
        self.pool.post(task)
    }

    /// Submit every entry with deadline ≤ `tp`, in `(deadline, sequence)`
    /// order, removing only what was actually submitted. Stops at the first
    /// rejection; the rejected entry is reinserted under its original key so
    /// ordering is preserved for the retry on the next timer wake.
    ///
    /// Returns `false` if the pass ended in a rejection, leaving due entries
    /// behind.
    fn submit_expired_before(&self, vault: &mut Vault, tp: Instant) -> bool {
        while let Some(entry) = vault.entries.first_entry() {
            let key = *entry.key();
            if key.0 > tp {
                break;
            }
            let task = entry.remove();
            if let Err(task) = self.submit_to_pool(task) {
                vault.entries.insert(key, task);
                debug!(
                    pending = vault.entries.len(),
                    "pool rejected due task, will retry on next wake"
                );
                return false;
            }
        }
        true
    }
}

/// Deadline scheduler bound to a [`WorkerPool`].
pub struct Scheduler {
    shared: Arc<Shared>,
    max_sleep_quantum: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a stopped scheduler submitting into `pool`, with the default
    /// sleep quantum.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool,
                vault: Mutex::new(Vault {
                    entries: BTreeMap::new(),
                    next_seq: 0,
                }),
                waiter: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
            max_sleep_quantum: Duration::from_millis(DEFAULT_MAX_SLEEP_QUANTUM_MS),
            timer: Mutex::new(None),
        }
    }

    /// Override the timer thread's maximum sleep quantum.
    #[must_use]
    pub fn with_max_sleep_quantum(mut self, quantum: Duration) -> Self {
        self.max_sleep_quantum = quantum;
        self
    }

    /// Schedule `task` for submission at `deadline`.
    ///
    /// An already-due deadline bypasses the vault and goes straight to the
    /// pool; if that direct submission is rejected the task is vaulted at the
    /// current instant so the timer retries it. Scheduling works whether or
    /// not the timer thread is running.
    pub fn schedule_at(&self, deadline: Instant, task: Task) {
        let now = Instant::now();
        if deadline <= now {
            match self.shared.submit_to_pool(task) {
                Ok(()) => return,
                Err(task) => {
                    // Never drop a scheduled task: park it for the retry path.
                    self.shared.vault.lock().insert(now, task);
                    self.shared.waiter.notify_one();
                    return;
                }
            }
        }
        self.shared.vault.lock().insert(deadline, task);
        self.shared.waiter.notify_one();
    }

    /// Schedule `task` for submission after `delay` from now.
    pub fn schedule_after(&self, delay: Duration, task: Task) {
        self.schedule_at(Instant::now() + delay, task);
    }

    /// Number of tasks currently waiting in the vault.
    pub fn callback_count(&self) -> usize {
        self.shared.vault.lock().entries.len()
    }

    /// Spawn the timer thread. No-op if already running.
    ///
    /// Not safe to call concurrently with [`Scheduler::stop`]; the caller
    /// owns that serialization.
    pub fn start(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return;
        }
        self.shared.stop.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let quantum = self.max_sleep_quantum;
        *timer = Some(
            thread::Builder::new()
                .name("chronopool-timer".into())
                .spawn(move || timer_worker(&shared, quantum))
                .expect("failed to spawn timer thread"),
        );
        info!("scheduler started");
    }

    /// Signal the timer thread and join it. No-op if already stopped.
    ///
    /// Vaulted tasks survive a stop and resume counting down after the next
    /// `start`. The bound pool is left untouched.
    pub fn stop(&self) {
        let handle = self.timer.lock().take();
        let Some(handle) = handle else {
            return;
        };
        self.shared.stop.store(true, Ordering::Release);
        self.shared.waiter.notify_all();
        if handle.join().is_err() {
            warn!("scheduler timer thread panicked");
        }
        info!("scheduler stopped");
    }

    /// Whether the timer thread is currently not running.
    pub fn is_stopped(&self) -> bool {
        self.timer.lock().is_none()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn timer_worker(shared: &Shared, quantum: Duration) {
    debug!("scheduler timer thread started");
    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
        let now = Instant::now();
        let mut vault = shared.vault.lock();
        match vault.entries.first_key_value().map(|(key, _)| *key) {
            Some((deadline, _)) if deadline <= now => {
                // Something is due: submit now and loop without waiting. A
                // rejected pass instead backs off one quantum so backpressure
                // does not turn into a hot retry loop.
                if !shared.submit_expired_before(&mut vault, now) {
                    let _ = shared.waiter.wait_until(&mut vault, now + quantum);
                }
            }
            Some((deadline, _)) => {
                // Bounded wait: an insertion or stop signal wakes us early,
                // the quantum caps how long a missed wakeup could cost.
                let wake_at = deadline.min(now + quantum);
                let _ = shared.waiter.wait_until(&mut vault, wake_at);
            }
            None => {
                let _ = shared.waiter.wait_until(&mut vault, now + quantum);
            }
        }
    }
    debug!("scheduler timer thread exiting");
}
