//! Type-erased unit of work with a one-shot result channel.
//!
//! A [`Task`] wraps an arbitrary zero-argument closure (argument binding is
//! done with ordinary move captures) together with a promise for its result.
//! Running the task executes the closure under `panic::catch_unwind` and
//! routes the return value, or the captured panic, into the promise, so a
//! faulting task can never take down the worker thread that invokes it.
//!
//! The caller's side of the channel is a [`TaskHandle<R>`], retrieved from the
//! task before it is posted. The handle is stored type-erased inside the task;
//! retrieval with the wrong `R` fails with [`HandleError::WrongResultType`]
//! via a checked downcast instead of misbehaving silently. A task that is
//! discarded without ever running fulfills its promise with
//! [`TaskError::Cancelled`] on drop, so waiters never hang.

use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::error::{HandleError, TaskError};

/// One-shot result slot shared between promise and handle.
enum Slot<R> {
    Pending,
    Ready(Result<R, TaskError>),
    Taken,
}

struct Shared<R> {
    slot: Mutex<Slot<R>>,
    ready: Condvar,
}

impl<R> Shared<R> {
    fn complete(&self, outcome: Result<R, TaskError>) {
        let mut slot = self.slot.lock();
        // At most one result is ever produced.
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Ready(outcome);
            drop(slot);
            self.ready.notify_all();
        }
    }
}

/// Producer side of the result channel. Consumed by fulfillment; dropping an
/// unfulfilled promise delivers [`TaskError::Cancelled`] instead.
struct Promise<R> {
    shared: Arc<Shared<R>>,
    fulfilled: bool,
}

impl<R> Promise<R> {
    fn fulfill(mut self, outcome: Result<R, TaskError>) {
        self.shared.complete(outcome);
        self.fulfilled = true;
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.shared.complete(Err(TaskError::Cancelled));
        }
    }
}

/// Consumer side of a task's one-shot result channel.
///
/// Obtained from [`Task::handle`] (or the `submit` helpers on the pools).
/// Waiting blocks on a condition variable until the worker fulfills the
/// promise; there is no polling involved.
pub struct TaskHandle<R> {
    shared: Arc<Shared<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run, returning its value or captured failure.
    pub fn wait(self) -> Result<R, TaskError> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => outcome,
            // Unreachable in practice: `wait` consumes the only handle.
            _ => Err(TaskError::Cancelled),
        }
    }

    /// Like [`TaskHandle::wait`], but gives up after `timeout` with
    /// [`TaskError::Timeout`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<R, TaskError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            let timed_out = self.shared.ready.wait_until(&mut slot, deadline).timed_out();
            if timed_out && matches!(*slot, Slot::Pending) {
                return Err(TaskError::Timeout);
            }
        }
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => outcome,
            _ => Err(TaskError::Cancelled),
        }
    }

    /// Non-blocking probe: whether the result has been produced.
    pub fn is_ready(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Ready(_))
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

impl<R> PartialEq for TaskHandle<R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Type-erased, zero-argument unit of work.
///
/// ```
/// use chronopool::core::Task;
///
/// let base = 40;
/// let mut task = Task::new(move || base + 2);
/// let handle = task.handle::<i32>().unwrap();
/// task.run();
/// assert_eq!(handle.wait(), Ok(42));
/// ```
pub struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
    /// Boxed `TaskHandle<R>`, erased so the queue stays untyped. `None` once
    /// taken by the caller.
    handle: Option<Box<dyn Any + Send>>,
}

impl Task {
    /// Wrap `f` into a task, creating its result channel.
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        });
        let promise = Promise {
            shared: Arc::clone(&shared),
            fulfilled: false,
        };
        let job = move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| TaskError::Panicked(panic_message(&*payload)));
            promise.fulfill(outcome);
        };
        Self {
            job: Box::new(job),
            handle: Some(Box::new(TaskHandle { shared })),
        }
    }

    /// Take the typed result handle out of the task.
    ///
    /// Fails with [`HandleError::WrongResultType`] if `R` is not the type the
    /// wrapped closure returns (the handle stays in place for a later
    /// correctly-typed request), and with [`HandleError::NoResult`] if the
    /// handle was already taken.
    pub fn handle<R: Send + 'static>(&mut self) -> Result<TaskHandle<R>, HandleError> {
        let erased = self.handle.take().ok_or(HandleError::NoResult)?;
        match erased.downcast::<TaskHandle<R>>() {
            Ok(handle) => Ok(*handle),
            Err(erased) => {
                self.handle = Some(erased);
                Err(HandleError::WrongResultType)
            }
        }
    }

    /// Invoke the wrapped closure, consuming the task.
    ///
    /// A panic inside the closure is captured and delivered through the
    /// result channel; it never propagates to the calling thread.
    pub fn run(self) {
        (self.job)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("handle_taken", &self.handle.is_none())
            .finish()
    }
}

/// Render a `catch_unwind` payload as a message. Panics raised via the `panic!`
/// macro carry a `&str` or `String`; anything else is reported opaquely.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}
