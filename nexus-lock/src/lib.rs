//! # nexus-lock
//!
//! Pluggable mutual exclusion for short critical sections.
//!
//! ## Why another lock?
//!
//! A scheduler-mediated mutex costs a syscall whenever it contends. When the
//! critical section is a handful of comparisons and swaps (pushing onto a
//! binary heap, say), that syscall dominates the work being protected.
//! A spin lock keeps the waiting thread on-CPU and hands off in tens of
//! cycles instead.
//!
//! The flip side: a spin lock is unfair and burns CPU while it waits. Under
//! long or heavily contended critical sections a blocking lock wins. So the
//! lock is a type parameter, not a hard-coded choice.
//!
//! ```text
//! RawLock (lock / try_lock / unlock)
//!     │
//!     ├── SpinLock      - CAS + bounded exponential yield backoff (default)
//!     │
//!     └── BlockingLock  - Mutex<bool> + Condvar, waiters sleep in the kernel
//!
//! Mutex<T, L: RawLock>  - RAII guard over any RawLock
//! ```
//!
//! ## Example
//!
//! ```
//! use nexus_lock::{BlockingLock, Mutex, SpinLock};
//!
//! // Default: spin lock
//! let counter: Mutex<u64> = Mutex::new(0);
//! *counter.lock() += 1;
//! assert_eq!(*counter.lock(), 1);
//!
//! // Same API, blocking lock underneath
//! let counter: Mutex<u64, BlockingLock> = Mutex::new(0);
//! *counter.lock() += 1;
//! assert_eq!(counter.into_inner(), 1);
//!
//! // Raw locks are usable on their own
//! let raw = SpinLock::new();
//! use nexus_lock::RawLock;
//! raw.lock();
//! assert!(!raw.try_lock());
//! unsafe { raw.unlock() };
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod blocking;
mod mutex;
mod raw;
mod spin;

pub use blocking::BlockingLock;
pub use mutex::{Mutex, MutexGuard};
pub use raw::RawLock;
pub use spin::{MAX_BACKOFF, SpinLock};
