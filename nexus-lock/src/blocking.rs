//! A lock whose waiters sleep in the scheduler.

use std::fmt;
use std::sync::{Condvar, PoisonError};

use crate::RawLock;

/// A guard-less blocking lock built from `std::sync::Mutex<bool>` and a
/// `Condvar`.
///
/// Waiters are descheduled rather than spinning, so this is the lock to pick
/// when the protected section is not guaranteed to be short or when many
/// threads contend.
///
/// The inner mutex only guards the `held` flag for the duration of a check,
/// so poisoning can never leave it inconsistent and is simply ignored.
///
/// # Example
///
/// ```
/// use nexus_lock::{BlockingLock, RawLock};
///
/// let lock = BlockingLock::new();
/// lock.lock();
/// assert!(!lock.try_lock());
/// unsafe { lock.unlock() };
/// assert!(lock.try_lock());
/// unsafe { lock.unlock() };
/// ```
pub struct BlockingLock {
    held: std::sync::Mutex<bool>,
    released: Condvar,
}

impl BlockingLock {
    /// Creates an unlocked blocking lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: std::sync::Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Returns `true` if the lock is currently held.
    ///
    /// This is a racy snapshot, useful for diagnostics only.
    pub fn is_locked(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BlockingLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl RawLock for BlockingLock {
    fn lock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    fn try_lock(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    unsafe fn unlock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

impl fmt::Debug for BlockingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
