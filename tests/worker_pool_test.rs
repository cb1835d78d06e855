//! Integration tests for the worker pool: lifecycle cycling, task execution,
//! panic isolation, backpressure, and active-task accounting.

use chronopool::config::PoolConfig;
use chronopool::core::{PoolError, Task, TaskError, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn small_pool(workers: usize, capacity: usize) -> WorkerPool {
    let config = PoolConfig::new()
        .with_worker_count(workers)
        .with_queue_capacity(capacity);
    WorkerPool::new(config).unwrap()
}

#[test]
fn executor_lifetime_cycle() {
    const WORKERS: usize = 5;
    let pool = WorkerPool::with_workers(WORKERS).unwrap();

    assert!(pool.is_stopped());
    assert_eq!(pool.worker_count(), WORKERS);
    assert_eq!(pool.active_task_count(), 0);

    pool.start();

    assert!(!pool.is_stopped());
    assert_eq!(pool.worker_count(), WORKERS);
    assert_eq!(pool.active_task_count(), 0);

    let handle = pool
        .submit(|| thread::sleep(Duration::from_millis(200)))
        .unwrap();
    // Give the task time to start, then observe it mid-invocation.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(pool.active_task_count(), 1);

    assert_eq!(handle.wait(), Ok(()));

    pool.stop();

    assert!(pool.is_stopped());
    assert_eq!(pool.worker_count(), WORKERS);
    assert_eq!(pool.active_task_count(), 0);
}

#[test]
fn tasks_posted_before_start_run_after_start() {
    let pool = small_pool(2, 16);
    let counter = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        let mut task = Task::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        handles.push(task.handle::<()>().unwrap());
        assert!(pool.post(task).is_ok());
    }
    assert_eq!(pool.queued_task_count(), 10);

    pool.start();
    for handle in handles {
        assert_eq!(handle.wait(), Ok(()));
    }
    pool.stop();

    assert_eq!(counter.load(Ordering::Relaxed), 10);
}

#[test]
fn submit_returns_typed_results() {
    let pool = small_pool(2, 16);
    pool.start();

    let sum = pool.submit(|| 19 + 23).unwrap();
    let text = pool.submit(|| format!("id-{}", 7)).unwrap();

    assert_eq!(sum.wait(), Ok(42));
    assert_eq!(text.wait(), Ok("id-7".to_owned()));
    pool.stop();
}

#[test]
fn panicking_task_does_not_kill_its_worker() {
    // Single worker: if the panic escaped, nothing could run afterwards.
    let pool = small_pool(1, 16);
    pool.start();

    let bad = pool.submit(|| -> u32 { panic!("deliberate failure") }).unwrap();
    assert_eq!(
        bad.wait(),
        Err(TaskError::Panicked("deliberate failure".into()))
    );

    let good = pool.submit(|| 5u32).unwrap();
    assert_eq!(good.wait(), Ok(5));
    pool.stop();
}

#[test]
fn queue_full_surfaces_as_backpressure() {
    // Stopped pool: nothing drains the queue, so capacity is deterministic.
    let pool = small_pool(1, 2);
    assert!(pool.post(Task::new(|| {})).is_ok());
    assert!(pool.post(Task::new(|| {})).is_ok());
    assert!(pool.post(Task::new(|| {})).is_err());
    assert_eq!(pool.submit(|| 1).err(), Some(PoolError::QueueFull));
}

#[test]
fn repeated_start_stop_cycles_are_stable() {
    let pool = small_pool(3, 16);
    for cycle in 0..5u32 {
        pool.start();
        assert!(!pool.is_stopped());

        let handle = pool.submit(move || cycle * 2).unwrap();
        assert_eq!(handle.wait(), Ok(cycle * 2));

        pool.stop();
        assert!(pool.is_stopped());
        assert_eq!(pool.active_task_count(), 0);
        assert_eq!(pool.queued_task_count(), 0);
    }
}

#[test]
fn queued_tasks_report_cancelled_when_pool_is_dropped() {
    let pool = small_pool(1, 8);
    // Pool never starts; the task is discarded unexecuted with the pool.
    let mut task = Task::new(|| 99);
    let handle = task.handle::<i32>().unwrap();
    assert!(pool.post(task).is_ok());
    drop(pool);

    assert_eq!(handle.wait(), Err(TaskError::Cancelled));
}

#[test]
fn concurrent_submitters_all_complete() {
    let pool = Arc::new(small_pool(4, 128));
    pool.start();
    let counter = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let mut handles = Vec::new();
                for _ in 0..25 {
                    let counter = Arc::clone(&counter);
                    let handle = pool
                        .submit(move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                        })
                        .unwrap();
                    handles.push(handle);
                }
                for handle in handles {
                    assert_eq!(handle.wait(), Ok(()));
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::Relaxed), 100);
    pool.stop();
}
