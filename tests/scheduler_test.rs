//! Integration tests for the scheduler: deadline honoring, ordering among
//! deferred tasks, past-deadline bypass, and backpressure retry.

use chronopool::core::{Scheduler, Task, WorkerPool};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn started_pool(workers: usize) -> Arc<WorkerPool> {
    let pool = Arc::new(WorkerPool::with_workers(workers).unwrap());
    pool.start();
    pool
}

/// Spin until `predicate` holds or `timeout` elapses; returns success.
fn wait_for(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

#[test]
fn scheduled_callbacks_fire_and_vault_drains() {
    let pool = started_pool(5);
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();
    assert_eq!(scheduler.callback_count(), 0);

    let counter = Arc::new(AtomicUsize::new(0));
    for delay_ms in [5u64, 10] {
        let counter = Arc::clone(&counter);
        scheduler.schedule_after(
            Duration::from_millis(delay_ms),
            Task::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }
    assert_eq!(scheduler.callback_count(), 2);

    assert!(wait_for(Duration::from_secs(1), || {
        counter.load(Ordering::Relaxed) == 2
    }));
    assert_eq!(scheduler.callback_count(), 0);

    scheduler.stop();
    pool.stop();
}

#[test]
fn delays_execute_in_deadline_order() {
    let pool = started_pool(1);
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();

    let order = Arc::new(Mutex::new(Vec::new()));
    // Scheduled out of order on purpose: 30ms, 10ms, 20ms.
    for delay_ms in [30u64, 10, 20] {
        let order = Arc::clone(&order);
        scheduler.schedule_after(
            Duration::from_millis(delay_ms),
            Task::new(move || order.lock().push(delay_ms)),
        );
    }

    assert!(wait_for(Duration::from_secs(1), || order.lock().len() == 3));
    assert_eq!(*order.lock(), vec![10, 20, 30]);

    scheduler.stop();
    pool.stop();
}

#[test]
fn equal_deadlines_execute_in_scheduling_order() {
    let pool = started_pool(1);
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();

    let order = Arc::new(Mutex::new(Vec::new()));
    let deadline = Instant::now() + Duration::from_millis(30);
    for i in 0..6u32 {
        let order = Arc::clone(&order);
        scheduler.schedule_at(deadline, Task::new(move || order.lock().push(i)));
    }

    assert!(wait_for(Duration::from_secs(1), || order.lock().len() == 6));
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);

    scheduler.stop();
    pool.stop();
}

#[test]
fn past_deadline_bypasses_the_vault_and_runs_immediately() {
    let pool = started_pool(2);
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();

    let mut task = Task::new(|| {});
    let handle = task.handle::<()>().unwrap();
    let scheduled_at = Instant::now();
    scheduler.schedule_at(scheduled_at - Duration::from_millis(100), task);

    // Bypass path: never vaulted, picked up within a notification latency.
    assert_eq!(scheduler.callback_count(), 0);
    assert_eq!(handle.wait_timeout(Duration::from_millis(100)), Ok(()));
    assert!(
        scheduled_at.elapsed() < Duration::from_millis(100),
        "bypass submission took {:?}",
        scheduled_at.elapsed()
    );

    scheduler.stop();
    pool.stop();
}

#[test]
fn deadline_is_not_fired_early() {
    let pool = started_pool(1);
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();

    const DELAY: Duration = Duration::from_millis(60);
    let fired_at = Arc::new(Mutex::new(None));
    let scheduled_at = Instant::now();
    {
        let fired_at = Arc::clone(&fired_at);
        scheduler.schedule_after(
            DELAY,
            Task::new(move || {
                *fired_at.lock() = Some(Instant::now());
            }),
        );
    }

    assert!(wait_for(Duration::from_secs(1), || fired_at.lock().is_some()));
    let elapsed = fired_at.lock().take().unwrap() - scheduled_at;
    assert!(elapsed >= DELAY, "fired {elapsed:?} after scheduling, before the {DELAY:?} deadline");
    // Generous upper bound: one sleep quantum plus queue/worker latency.
    assert!(
        elapsed < DELAY + Duration::from_millis(150),
        "fired {elapsed:?} after scheduling"
    );

    scheduler.stop();
    pool.stop();
}

#[test]
fn submission_into_stopped_pool_is_retried_until_pool_starts() {
    let pool = Arc::new(WorkerPool::with_workers(2).unwrap());
    let scheduler = Scheduler::new(Arc::clone(&pool));
    scheduler.start();

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let counter = Arc::clone(&counter);
        scheduler.schedule_after(
            Duration::from_millis(5),
            Task::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }

    // The deadlines pass while the pool is stopped; nothing may be dropped.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(counter.load(Ordering::Relaxed), 0);
    assert_eq!(scheduler.callback_count(), 3);

    pool.start();
    assert!(wait_for(Duration::from_secs(1), || {
        counter.load(Ordering::Relaxed) == 3
    }));
    assert_eq!(scheduler.callback_count(), 0);

    scheduler.stop();
    pool.stop();
}

#[test]
fn vaulted_tasks_survive_a_scheduler_restart() {
    let pool = started_pool(1);
    let scheduler = Scheduler::new(Arc::clone(&pool));

    let counter = Arc::new(AtomicUsize::new(0));
    {
        let counter = Arc::clone(&counter);
        scheduler.schedule_after(
            Duration::from_millis(30),
            Task::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }
    assert_eq!(scheduler.callback_count(), 1);

    // Timer never ran yet; a start/stop/start cycle must not lose the entry.
    scheduler.start();
    scheduler.stop();
    assert_eq!(counter.load(Ordering::Relaxed), 0);
    scheduler.start();

    assert!(wait_for(Duration::from_secs(1), || {
        counter.load(Ordering::Relaxed) == 1
    }));

    scheduler.stop();
    pool.stop();
}
