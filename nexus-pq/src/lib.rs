//! # nexus-pq
//!
//! A bounded, closable, thread-safe priority queue over an explicit binary
//! heap.
//!
//! ## Layout
//!
//! ```text
//! compare  - Compare<T> trait, Natural, Reversed, closures as comparators
//!    │
//! heap     - push / pop / build / sort over Vec<T>, plus an owning Heap<T, C>
//!    │
//! queue    - PriorityQueue<T, C, L>: heap + RawLock + parked consumers
//!    │           try_push (never blocks)
//!    │           pop / pop_cancellable / pop_timeout (may suspend)
//!    │           close (drains in-flight calls, returns the rest sorted)
//!    │
//! cancel   - CancelToken for giving up on a suspended pop
//! ```
//!
//! The lock is pluggable through [`nexus_lock::RawLock`]. The default
//! [`SpinLock`] suits the queue's short critical sections; swap in
//! [`BlockingLock`] when threads outnumber cores or the comparator is
//! expensive.
//!
//! ## Example
//!
//! ```
//! use nexus_pq::{PriorityQueue, QueueConfig, compare::Natural};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(PriorityQueue::new(QueueConfig::new(Natural).with_limit(64)).unwrap());
//!
//! let consumer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         let mut seen = Vec::new();
//!         while let Some(x) = queue.pop() {
//!             seen.push(x);
//!         }
//!         seen
//!     })
//! };
//!
//! for x in 0..10u32 {
//!     while queue.try_push(x).is_err() {
//!         thread::yield_now();
//!     }
//! }
//!
//! // Wakes the consumer once it runs dry. Whatever it has not taken yet is
//! // handed back here instead.
//! let rest = queue.close();
//! let seen = consumer.join().unwrap();
//! assert_eq!(seen.len() + rest.len(), 10);
//! ```
//!
//! ## Tracing
//!
//! Build with `--features tracing` and call [`init_tracing`] to log queue
//! construction and the close protocol. `RUST_LOG` overrides the default
//! `nexus_pq=debug` filter.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod cancel;
pub mod compare;
mod error;
pub mod heap;
mod queue;
mod trace;

pub use cancel::CancelToken;
pub use compare::{Compare, Natural, Reversed};
pub use error::{ConfigError, Rejected};
pub use heap::Heap;
pub use nexus_lock::{BlockingLock, RawLock, SpinLock};
pub use queue::{PriorityQueue, QueueConfig};
pub use trace::init_tracing;
