//! Error types.

use std::fmt;

use thiserror::Error;

/// Errors surfaced when constructing a [`PriorityQueue`](crate::PriorityQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration did not supply a comparator.
    #[error("invalid queue configuration: missing comparator")]
    MissingComparator,
}

/// Error returned by [`PriorityQueue::try_push`](crate::PriorityQueue::try_push).
///
/// The queue was either at its limit or closed. Both cases hand the value
/// back; call [`is_closed`](crate::PriorityQueue::is_closed) to tell them
/// apart.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rejected<T>(pub T);

impl<T> Rejected<T> {
    /// Returns the value that could not be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full or closed")
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").finish_non_exhaustive()
    }
}

impl<T> std::error::Error for Rejected<T> {}
