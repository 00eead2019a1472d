//! Guard-based mutex over any [`RawLock`].

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::{RawLock, SpinLock};

/// A mutex protecting a `T`, parameterized by the raw lock doing the work.
///
/// `L` defaults to [`SpinLock`]. Swap in [`BlockingLock`](crate::BlockingLock)
/// (or any other [`RawLock`]) without touching the code that locks.
///
/// # Example
///
/// ```
/// use nexus_lock::{BlockingLock, Mutex};
/// use std::sync::Arc;
/// use std::thread;
///
/// let shared = Arc::new(Mutex::<Vec<u32>, BlockingLock>::new(Vec::new()));
///
/// let handles: Vec<_> = (0..4)
///     .map(|i| {
///         let shared = Arc::clone(&shared);
///         thread::spawn(move || shared.lock().push(i))
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(shared.lock().len(), 4);
/// ```
pub struct Mutex<T: ?Sized, L: RawLock = SpinLock> {
    raw: L,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `raw`; moving the mutex moves T.
unsafe impl<T: ?Sized + Send, L: RawLock> Send for Mutex<T, L> {}

// Safety: only one thread at a time can reach `data` through a guard, so
// sharing the mutex only requires that T can be sent between threads.
unsafe impl<T: ?Sized + Send, L: RawLock> Sync for Mutex<T, L> {}

impl<T, L: RawLock + Default> Mutex<T, L> {
    /// Creates a mutex using a default-constructed raw lock.
    pub fn new(value: T) -> Self {
        Self::with_lock(value, L::default())
    }
}

impl<T, L: RawLock> Mutex<T, L> {
    /// Creates a mutex around `value` guarded by the given raw lock.
    pub const fn with_lock(value: T, raw: L) -> Self {
        Self {
            raw,
            data: UnsafeCell::new(value),
        }
    }

    /// Consumes the mutex, returning the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized, L: RawLock> Mutex<T, L> {
    /// Acquires the lock, returning a guard that releases it on drop.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T, L> {
        self.raw.lock();
        MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }

    /// Attempts to acquire the lock without waiting.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, L>> {
        if self.raw.try_lock() {
            Some(MutexGuard {
                mutex: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the protected value.
    ///
    /// No locking is needed: `&mut self` proves exclusive access.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Returns the raw lock.
    #[inline]
    pub const fn raw(&self) -> &L {
        &self.raw
    }
}

impl<T: Default, L: RawLock + Default> Default for Mutex<T, L> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized, L: RawLock> fmt::Debug for Mutex<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").finish_non_exhaustive()
    }
}

/// RAII guard returned by [`Mutex::lock`]. Unlocks when dropped.
#[must_use = "if unused the mutex will immediately unlock"]
pub struct MutexGuard<'a, T: ?Sized, L: RawLock> {
    mutex: &'a Mutex<T, L>,
    // Raw locks may be thread-affine (unlocking from another thread is not
    // part of the contract), so guards stay on the locking thread.
    _not_send: PhantomData<*const ()>,
}

// Safety: a shared guard only hands out &T.
unsafe impl<T: ?Sized + Sync, L: RawLock> Sync for MutexGuard<'_, T, L> {}

impl<T: ?Sized, L: RawLock> Deref for MutexGuard<'_, T, L> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: the guard proves we hold the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized, L: RawLock> DerefMut for MutexGuard<'_, T, L> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard proves we hold the lock, and &mut self proves
        // no other reference derived from this guard is alive.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized, L: RawLock> Drop for MutexGuard<'_, T, L> {
    #[inline]
    fn drop(&mut self) {
        // Safety: the guard was created by a successful acquisition.
        unsafe { self.mutex.raw.unlock() };
    }
}

impl<T: ?Sized + fmt::Debug, L: RawLock> fmt::Debug for MutexGuard<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
