//! Bounded concurrent queue with blocking and non-blocking pop variants.
//!
//! The queue is a fixed-capacity ring buffer guarded by a single
//! `parking_lot::Mutex`; one `Condvar` signals both "became non-empty" and
//! "became halted". Producers never block: a full queue rejects the push and
//! hands the item back to the caller. Consumers choose between [`BoundedQueue::pop`]
//! (blocks unconditionally) and [`BoundedQueue::try_pop`] (blocks only while the
//! queue is empty *and* accepting waits, so halting the queue unblocks idle
//! consumers during shutdown).

use parking_lot::{Condvar, Mutex};

/// Ring-buffer state. Everything in here is guarded by the queue's mutex.
struct RingState<T> {
    slots: Vec<Option<T>>,
    front: usize,
    back: usize,
    len: usize,
    /// When set, `try_pop` on an empty queue returns `None` instead of waiting.
    halted: bool,
}

impl<T> RingState<T> {
    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    fn push_back(&mut self, item: T) {
        debug_assert!(!self.is_full());
        self.slots[self.back] = Some(item);
        self.back = (self.back + 1) % self.slots.len();
        self.len += 1;
    }

    fn pop_front(&mut self) -> T {
        debug_assert!(!self.is_empty());
        let item = match self.slots[self.front].take() {
            Some(item) => item,
            None => unreachable!("front slot occupied while len > 0"),
        };
        self.front = (self.front + 1) % self.slots.len();
        self.len -= 1;
        item
    }
}

/// Fixed-capacity blocking queue with a cooperative halt signal.
///
/// A freshly constructed queue is **halted**: [`BoundedQueue::try_pop`] on an
/// empty queue returns `None` immediately until [`BoundedQueue::resume`] is
/// called. This matches the owning pool's stopped-at-construction lifecycle:
/// consumers only park in `try_pop` between `resume` and `halt`.
pub struct BoundedQueue<T> {
    state: Mutex<RingState<T>>,
    notifier: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create an empty, halted queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            state: Mutex::new(RingState {
                slots,
                front: 0,
                back: 0,
                len: 0,
                halted: true,
            }),
            notifier: Condvar::new(),
        }
    }

    /// Push `item` at the back without blocking.
    ///
    /// Returns `Err(item)` if the queue is at capacity, handing the item back
    /// to the caller (backpressure). On success one waiting consumer is woken.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.is_full() {
            return Err(item);
        }
        state.push_back(item);
        drop(state);
        self.notifier.notify_one();
        Ok(())
    }

    /// Pop the front item, blocking until one is available.
    ///
    /// Ignores the halt signal entirely; use only where waiting through a
    /// shutdown is intended.
    pub fn pop(&self) -> T {
        let mut state = self.state.lock();
        while state.is_empty() {
            self.notifier.wait(&mut state);
        }
        state.pop_front()
    }

    /// Pop the front item, blocking while the queue is empty and not halted.
    ///
    /// Returns `None` once the queue is halted while still empty. This is the
    /// shutdown escape hatch for consumer loops: [`BoundedQueue::halt`] wakes
    /// every parked consumer and each observes the empty queue and returns.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.is_empty() && !state.halted {
            self.notifier.wait(&mut state);
        }
        if state.is_empty() {
            None
        } else {
            Some(state.pop_front())
        }
    }

    /// Set the halted flag and wake all parked consumers.
    pub fn halt(&self) {
        let mut state = self.state.lock();
        state.halted = true;
        drop(state);
        self.notifier.notify_all();
    }

    /// Clear the halted flag, re-enabling blocking waits in `try_pop`.
    ///
    /// No notification is needed: nothing ever waits for the queue to become
    /// halted.
    pub fn resume(&self) {
        self.state.lock().halted = false;
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }
}
