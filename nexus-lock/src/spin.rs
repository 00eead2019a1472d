//! Busy-wait lock with bounded exponential yield backoff.
//!
//! # Acquisition
//!
//! ```text
//! lock():
//!   loop
//!     ├── load(locked) == false ?  ── no ──┐   (read-only spin, no RFO)
//!     │                                    │
//!     ├── CAS false -> true ── ok ──> held │
//!     │                                    │
//!     └── yield_now() x backoff  <─────────┘
//!         backoff = min(backoff * 2, MAX_BACKOFF)
//! ```
//!
//! The waiting thread never parks: it stays runnable and gives the processor
//! away with `yield_now`, up to [`MAX_BACKOFF`] times between attempts.
//!
//! # When Not to Use This
//!
//! The lock is unfair (a newly arriving thread can beat one that has been
//! waiting) and a waiter consumes CPU for as long as it waits. That is the
//! price of a ~20 cycle uncontended handoff. If the protected section can
//! take long, or many threads hammer the same lock, use
//! [`BlockingLock`](crate::BlockingLock) instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_utils::CachePadded;

use crate::RawLock;

/// Upper bound on the number of yields between two acquisition attempts.
pub const MAX_BACKOFF: u32 = 16;

/// A non-reentrant, unfair spin lock.
///
/// The flag sits on its own cache line so spinning waiters don't bounce the
/// line holding the protected data.
///
/// # Example
///
/// ```
/// use nexus_lock::{RawLock, SpinLock};
///
/// let lock = SpinLock::new();
/// assert!(!lock.is_locked());
///
/// lock.lock();
/// assert!(lock.is_locked());
/// assert!(!lock.try_lock());
///
/// unsafe { lock.unlock() };
/// assert!(lock.try_lock());
/// unsafe { lock.unlock() };
/// ```
pub struct SpinLock {
    locked: CachePadded<AtomicBool>,
}

impl SpinLock {
    /// Creates an unlocked spin lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` if the lock is currently held.
    ///
    /// This is a racy snapshot, useful for diagnostics only.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_contended(&self) {
        let mut backoff = 1;
        loop {
            for _ in 0..backoff {
                thread::yield_now();
            }
            if backoff < MAX_BACKOFF {
                backoff <<= 1;
            }

            // Only attempt the CAS once the lock looks free, so waiters
            // share the line instead of fighting for exclusive ownership.
            if !self.locked.load(Ordering::Relaxed) && self.try_acquire() {
                return;
            }
        }
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl RawLock for SpinLock {
    #[inline]
    fn lock(&self) {
        if !self.try_acquire() {
            self.lock_contended();
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        !self.locked.load(Ordering::Relaxed) && self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
