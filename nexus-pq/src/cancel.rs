//! Cooperative cancellation for blocking pops.
//!
//! A [`CancelToken`] is shared between the thread that may give up and the
//! threads waiting on its behalf. Cancelling flips a flag and unparks every
//! thread currently suspended on the token.
//!
//! # Missed-Wakeup Freedom
//!
//! ```text
//! Waiter:                          Canceller:
//! ─────────────────────            ─────────────────────
//! lock(waiters)                    swap(cancelled, true)
//! register(unparker)               [SeqCst]
//! unlock(waiters)                  lock(waiters)
//! [SeqCst]                         unpark(all registered)
//! load(cancelled) -> false?        unlock(waiters)
//! park()
//! ```
//!
//! Either the canceller finds the registration (and unparks it, the token
//! is kept by the parker even if the unpark lands before `park`), or the
//! registration happened after the canceller released the list, in which
//! case the waiter's load observes `true` and it never parks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::sync::Unparker;
use nexus_lock::Mutex;

/// A cloneable, thread-safe cancellation flag.
///
/// # Example
///
/// ```
/// use nexus_pq::{CancelToken, PriorityQueue, compare::Natural};
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(PriorityQueue::<u32, _>::with_comparator(Natural));
/// let token = CancelToken::new();
///
/// let waiter = {
///     let queue = Arc::clone(&queue);
///     let token = token.clone();
///     thread::spawn(move || queue.pop_cancellable(&token))
/// };
///
/// token.cancel();
/// assert_eq!(waiter.join().unwrap(), None);
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    parked: Vec<(u64, Unparker)>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token, waking every thread currently waiting on it.
    ///
    /// Idempotent: only the first call does any work.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let parked = std::mem::take(&mut self.inner.waiters.lock().parked);
        for (_, unparker) in parked {
            unparker.unpark();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on this
    /// token or any of its clones.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a parked thread to be woken on cancellation.
    ///
    /// The registration is removed when the returned guard drops.
    pub(crate) fn register(&self, unparker: &Unparker) -> Registration<'_> {
        let mut registry = self.inner.waiters.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.parked.push((id, unparker.clone()));
        drop(registry);

        Registration { token: self, id }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a thread registered on a [`CancelToken`] while it may park.
pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut registry = self.token.inner.waiters.lock();
        // Already gone if cancel() drained the list.
        if let Some(pos) = registry.parked.iter().position(|(id, _)| *id == self.id) {
            registry.parked.swap_remove(pos);
        }
    }
}
