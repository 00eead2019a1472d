//! Bounded, closable, thread-safe priority queue.
//!
//! # Operations
//!
//! ```text
//! producers ── try_push ──┐                 ┌── pop ── consumers
//!                         ▼                 │   (suspends while empty)
//!               ┌──────────────────────┐    │
//!               │ Mutex<L>             │────┘
//!               │  ├── heap: Vec<T>    │
//!               │  └── waiters: FIFO   │
//!               └──────────────────────┘
//!                         ▲
//! operator ──── close ────┘  (drains in-flight ops, returns sorted rest)
//! ```
//!
//! Only `try_push` and the heap-mutating part of `pop` hold the lock, each
//! for O(log n) comparisons and swaps. That is what makes a spin lock the
//! sensible default.
//!
//! # Suspension
//!
//! A consumer finding the heap empty enqueues its [`Unparker`] on the waiter
//! list *under the same lock* that guards the heap, releases the lock, and
//! parks. A producer pushes and dequeues one waiter in the same critical
//! section, then unparks it after releasing the lock. Since the parker keeps
//! a token, an unpark that lands before `park` is not lost.
//!
//! # Closing
//!
//! ```text
//! Open ──close()──> Draining ──(in-flight counters reach 0)──> Closed
//! ```
//!
//! Every `try_push`/`pop` that starts while the queue is `Open` increments
//! an in-flight counter on entry and decrements it on every exit path (an
//! RAII guard, so unwinding too). Calls starting after closing began are
//! never counted: pushes are rejected outright, pops take whatever the heap
//! still holds under the lock or return `None`, and neither ever parks.
//! The first `close` to win the `Open -> Draining` CAS then:
//!
//! 1. Spins (yielding backoff) until no push is in flight. No push can
//!    commit after this point.
//! 2. Spins until no counted pop is in flight, broadcasting a wakeup on
//!    every iteration so parked consumers observe the closed flag and leave.
//! 3. Moves the remaining elements out of the heap under the lock, sorts
//!    them by descending priority after releasing it, publishes the
//!    snapshot, and flips to `Closed`.
//!
//! Every other caller of `close` waits for the snapshot and returns it.
//!
//! # Memory Ordering
//!
//! The counter increments, the phase CAS, and the loads on both sides are
//! `SeqCst`:
//!
//! ```text
//! Producer:                        Closer:
//! ─────────────────────            ─────────────────────
//! load(phase) -> Open?             CAS(phase, Open -> Draining)
//! fetch_add(pending_pushes)        [SeqCst]
//! [SeqCst]                         load(pending_pushes) == 0?
//! load(phase) -> Open?
//! ```
//!
//! In the single total order either the producer's second load sees
//! `Draining` and it backs out, or the closer sees the producer's increment
//! and waits for it. The first load keeps callers arriving well after the
//! CAS from touching the counter at all, so a stream of late polls cannot
//! hold it above zero.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crossbeam_utils::sync::{Parker, Unparker};
use crossbeam_utils::{Backoff, CachePadded};
use nexus_lock::{Mutex, RawLock, SpinLock};

use crate::cancel::CancelToken;
use crate::compare::Compare;
use crate::error::{ConfigError, Rejected};
use crate::heap;
use crate::trace::{debug, trace};

const OPEN: u8 = 0;
const DRAINING: u8 = 1;
const CLOSED: u8 = 2;

// ============================================================================
// Configuration
// ============================================================================

/// Construction parameters for a [`PriorityQueue`].
///
/// # Example
///
/// ```
/// use nexus_lock::BlockingLock;
/// use nexus_pq::{PriorityQueue, QueueConfig, compare::Natural};
///
/// let config = QueueConfig::new(Natural)
///     .with_limit(1024)
///     .with_lock(BlockingLock::new());
///
/// let queue: PriorityQueue<u64, _, _> = PriorityQueue::new(config).unwrap();
/// assert_eq!(queue.limit(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig<C, L = SpinLock> {
    /// Capacity hint for the heap's initial allocation.
    pub initial_capacity: usize,
    /// Maximum number of queued elements. `0` means unbounded.
    pub limit: usize,
    /// Lock guarding the heap.
    pub lock: L,
    /// Order in which elements are popped (greatest first). Required.
    pub comparator: Option<C>,
}

impl<C> QueueConfig<C> {
    /// Creates an unbounded configuration with the default spin lock.
    pub const fn new(comparator: C) -> Self {
        Self {
            initial_capacity: 0,
            limit: 0,
            lock: SpinLock::new(),
            comparator: Some(comparator),
        }
    }
}

impl<C, L> QueueConfig<C, L> {
    /// Sets the maximum number of queued elements. `0` means unbounded.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the capacity hint for the heap's initial allocation.
    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the comparator.
    #[must_use]
    pub fn with_comparator(mut self, comparator: C) -> Self {
        self.comparator = Some(comparator);
        self
    }

    /// Replaces the lock, possibly with a different lock type.
    pub fn with_lock<L2>(self, lock: L2) -> QueueConfig<C, L2> {
        QueueConfig {
            initial_capacity: self.initial_capacity,
            limit: self.limit,
            lock,
            comparator: self.comparator,
        }
    }
}

impl<C, L: Default> Default for QueueConfig<C, L> {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            limit: 0,
            lock: L::default(),
            comparator: None,
        }
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Everything guarded by the queue's lock.
struct State<T> {
    heap: Vec<T>,
    waiters: Waiters,
}

/// Parked consumers, oldest first.
///
/// Ids only grow, so key order is arrival order. Every operation is
/// O(log n) in the number of parked consumers.
#[derive(Default)]
struct Waiters {
    next_id: u64,
    parked: BTreeMap<u64, Unparker>,
}

impl Waiters {
    fn enqueue(&mut self, unparker: &Unparker) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.parked.insert(id, unparker.clone());
        id
    }

    /// Removes a waiter that woke for a reason other than being dequeued.
    fn forget(&mut self, id: u64) {
        self.parked.remove(&id);
    }

    fn dequeue(&mut self) -> Option<Unparker> {
        self.parked.pop_first().map(|(_, unparker)| unparker)
    }

    fn take_all(&mut self) -> BTreeMap<u64, Unparker> {
        std::mem::take(&mut self.parked)
    }
}

/// Decrements an in-flight counter when dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    /// Counts the caller as in flight if the queue is still open.
    ///
    /// Returns `None`, leaving the counter as it was, once closing has
    /// begun.
    #[inline]
    fn enter(counter: &'a AtomicUsize, phase: &AtomicU8) -> Option<Self> {
        if phase.load(Ordering::SeqCst) != OPEN {
            return None;
        }
        counter.fetch_add(1, Ordering::SeqCst);
        let guard = Self(counter);
        // Lost the race with close: back out before it waits on us.
        (phase.load(Ordering::SeqCst) == OPEN).then_some(guard)
    }
}

impl Drop for InFlight<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A thread-safe max-priority queue with an optional size limit and a
/// one-shot draining close.
///
/// Elements come out greatest-first under the comparator `C`; equal elements
/// come out in no particular order. `L` is the lock guarding the heap,
/// [`SpinLock`] by default.
///
/// To share the queue between threads `T` must be `Send + Sync`, because
/// [`close`](Self::close) hands every caller the same shared snapshot, and
/// `C` must be `Sync`: the final sort runs outside the lock.
///
/// # Example
///
/// ```
/// use nexus_pq::{PriorityQueue, QueueConfig, compare::Natural};
///
/// let queue = PriorityQueue::new(QueueConfig::new(Natural).with_limit(3)).unwrap();
///
/// assert!(queue.try_push(1).is_ok());
/// assert!(queue.try_push(2).is_ok());
/// assert!(queue.try_push(3).is_ok());
/// assert!(queue.try_push(4).is_err()); // full
///
/// assert_eq!(queue.pop(), Some(3));
/// assert_eq!(&*queue.close(), &[2, 1]);
///
/// assert_eq!(queue.pop(), None);
/// assert!(queue.try_push(5).is_err()); // closed
/// ```
pub struct PriorityQueue<T, C, L: RawLock = SpinLock> {
    state: Mutex<State<T>, L>,
    cmp: C,
    limit: usize,
    phase: CachePadded<AtomicU8>,
    pending_pushes: CachePadded<AtomicUsize>,
    pending_pops: CachePadded<AtomicUsize>,
    snapshot: OnceLock<Arc<[T]>>,
}

impl<T, C: Compare<T>> PriorityQueue<T, C> {
    /// Creates an unbounded queue with the default spin lock.
    pub fn with_comparator(comparator: C) -> Self {
        Self::from_parts(0, 0, SpinLock::new(), comparator)
    }
}

impl<T, C: Compare<T>, L: RawLock> PriorityQueue<T, C, L> {
    /// Creates a queue from a configuration.
    ///
    /// A non-zero `limit` larger than `initial_capacity` raises the initial
    /// allocation to `limit`, so a bounded queue never reallocates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingComparator`] if `config.comparator` is
    /// `None`.
    pub fn new(config: QueueConfig<C, L>) -> Result<Self, ConfigError> {
        let comparator = config.comparator.ok_or(ConfigError::MissingComparator)?;
        let capacity = config.initial_capacity.max(config.limit);

        debug!(
            limit = config.limit,
            initial_capacity = capacity,
            "priority queue created"
        );

        Ok(Self::from_parts(capacity, config.limit, config.lock, comparator))
    }

    fn from_parts(capacity: usize, limit: usize, lock: L, comparator: C) -> Self {
        let state = State {
            heap: Vec::with_capacity(capacity),
            waiters: Waiters::default(),
        };

        Self {
            state: Mutex::with_lock(state, lock),
            cmp: comparator,
            limit,
            phase: CachePadded::new(AtomicU8::new(OPEN)),
            pending_pushes: CachePadded::new(AtomicUsize::new(0)),
            pending_pops: CachePadded::new(AtomicUsize::new(0)),
            snapshot: OnceLock::new(),
        }
    }

    /// Attempts to push a value without waiting.
    ///
    /// On success, one suspended [`pop`](Self::pop) (if any) is woken.
    ///
    /// # Errors
    ///
    /// Returns `Err(Rejected(value))` if the queue is closed or already holds
    /// `limit` elements. Nothing is mutated in that case. Use
    /// [`is_closed`](Self::is_closed) to tell the two apart.
    pub fn try_push(&self, value: T) -> Result<(), Rejected<T>> {
        let Some(_in_flight) = InFlight::enter(&self.pending_pushes, &self.phase) else {
            return Err(Rejected(value));
        };

        let mut state = self.state.lock();

        // Re-check under the lock before committing.
        if self.is_closed() || (self.limit > 0 && state.heap.len() >= self.limit) {
            return Err(Rejected(value));
        }

        heap::push(&mut state.heap, value, &self.cmp);
        let waiter = state.waiters.dequeue();
        drop(state);

        if let Some(unparker) = waiter {
            unparker.unpark();
        }
        Ok(())
    }

    /// Removes the greatest element, suspending while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and empty. Never returns
    /// `None` on an open queue.
    pub fn pop(&self) -> Option<T> {
        self.pop_inner(None, None)
    }

    /// Like [`pop`](Self::pop), but also gives up when `token` is cancelled.
    ///
    /// An element that is already available is returned even if the token
    /// has fired; a cancelled pop never mutates the heap.
    pub fn pop_cancellable(&self, token: &CancelToken) -> Option<T> {
        self.pop_inner(Some(token), None)
    }

    /// Like [`pop`](Self::pop), but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        // An unrepresentable deadline is as good as none.
        let deadline = Instant::now().checked_add(timeout);
        if deadline.is_none() {
            return self.pop();
        }
        self.pop_inner(None, deadline)
    }

    /// Removes the greatest element if one is available, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        // Uncounted once closing began; the lock orders it against the drain.
        let _in_flight = InFlight::enter(&self.pending_pops, &self.phase);

        if self.phase.load(Ordering::SeqCst) == CLOSED {
            return None;
        }
        heap::pop(&mut self.state.lock().heap, &self.cmp)
    }

    fn pop_inner(&self, token: Option<&CancelToken>, deadline: Option<Instant>) -> Option<T> {
        // Uncounted once closing began. Such a pop never parks: the give-up
        // check below already sees the queue closed.
        let _in_flight = InFlight::enter(&self.pending_pops, &self.phase);

        // Closed queues are already drained into the snapshot.
        if self.phase.load(Ordering::SeqCst) == CLOSED {
            return None;
        }

        // Fast path: no parker allocation when data is waiting.
        {
            let mut state = self.state.lock();
            if let Some(value) = heap::pop(&mut state.heap, &self.cmp) {
                return Some(value);
            }
            if self.should_give_up(token, deadline) {
                return None;
            }
        }

        self.pop_slow(token, deadline)
    }

    #[cold]
    fn pop_slow(&self, token: Option<&CancelToken>, deadline: Option<Instant>) -> Option<T> {
        let parker = Parker::new();
        let _registration = token.map(|t| t.register(parker.unparker()));

        let mut state = self.state.lock();
        loop {
            if let Some(value) = heap::pop(&mut state.heap, &self.cmp) {
                return Some(value);
            }
            if self.should_give_up(token, deadline) {
                return None;
            }

            let id = state.waiters.enqueue(parker.unparker());
            drop(state);

            trace!("pop: suspending on empty queue");
            match deadline {
                Some(deadline) => {
                    parker.park_timeout(deadline.saturating_duration_since(Instant::now()));
                }
                None => parker.park(),
            }

            state = self.state.lock();
            // Still listed if woken by cancel, timeout, or spuriously.
            state.waiters.forget(id);
        }
    }

    #[inline]
    fn should_give_up(&self, token: Option<&CancelToken>, deadline: Option<Instant>) -> bool {
        self.is_closed()
            || token.is_some_and(CancelToken::is_cancelled)
            || deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Closes the queue and returns the elements left in it, greatest first.
    ///
    /// The first call blocks until every `try_push`/`pop` that was in flight
    /// when closing began has finished (suspended pops are woken and return
    /// `None`), then takes the remaining elements out of the queue. Every
    /// call, concurrent or later, returns the same snapshot.
    ///
    /// After `close` returns, `try_push` always fails and `pop` always
    /// returns `None` immediately.
    pub fn close(&self) -> Arc<[T]> {
        if self
            .phase
            .compare_exchange(OPEN, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.drain_and_finalize()
        } else {
            self.wait_for_snapshot()
        }
    }

    #[cold]
    fn drain_and_finalize(&self) -> Arc<[T]> {
        debug!("close: draining in-flight operations");

        let backoff = Backoff::new();
        while self.pending_pushes.load(Ordering::SeqCst) > 0 {
            backoff.snooze();
        }

        let backoff = Backoff::new();
        while self.pending_pops.load(Ordering::SeqCst) > 0 {
            self.wake_all();
            backoff.snooze();
        }

        let mut remaining = std::mem::take(&mut self.state.lock().heap);
        heap::sort(&mut remaining, &self.cmp);
        let remaining: Arc<[T]> = remaining.into();
        // Only the CAS winner reaches this point, so the cell is empty.
        let snapshot = Arc::clone(self.snapshot.get_or_init(|| remaining));
        self.phase.store(CLOSED, Ordering::SeqCst);

        debug!(remaining = snapshot.len(), "close: finalized");
        snapshot
    }

    #[cold]
    fn wait_for_snapshot(&self) -> Arc<[T]> {
        let backoff = Backoff::new();
        loop {
            if let Some(snapshot) = self.snapshot.get() {
                return Arc::clone(snapshot);
            }
            backoff.snooze();
        }
    }

    /// Unparks every suspended consumer.
    fn wake_all(&self) {
        let parked = self.state.lock().waiters.take_all();
        trace!(woken = parked.len(), "close: waking suspended pops");
        for unparker in parked.into_values() {
            unparker.unpark();
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    ///
    /// This becomes `true` as soon as closing begins, before in-flight
    /// operations have drained.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.phase.load(Ordering::SeqCst) != OPEN
    }

    /// Returns the number of queued elements.
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// Returns `true` if no elements are queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }

    /// Returns the size limit. `0` means unbounded.
    #[inline]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl<T, C, L: RawLock> fmt::Debug for PriorityQueue<T, C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase.load(Ordering::SeqCst) {
            OPEN => "open",
            DRAINING => "draining",
            _ => "closed",
        };
        f.debug_struct("PriorityQueue")
            .field("limit", &self.limit)
            .field("phase", &phase)
            .field("pending_pushes", &self.pending_pushes.load(Ordering::Relaxed))
            .field("pending_pops", &self.pending_pops.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
