//! Array-backed binary max-heap driven by a [`Compare`].
//!
//! The heap is a complete binary tree laid out in a slice: node `i` has
//! children `2i + 1` and `2i + 2`. Every node ranks greater-or-equal to both
//! children under the comparator, so the root is the maximum. Pass a
//! [`Reversed`](crate::compare::Reversed) comparator for min-heap behavior.
//!
//! ```text
//!              [9]                 index: 0
//!            /     \
//!         [7]       [8]            index: 1, 2
//!        /   \     /
//!      [3]   [5] [6]               index: 3, 4, 5
//!
//! slice: [9, 7, 8, 3, 5, 6]
//! ```
//!
//! The algorithms are free functions over `Vec<T>`/`[T]`, usable on any
//! vector the caller already owns. The concurrent queue keeps a bare vector
//! under its lock and its comparator outside it. [`Heap`] bundles storage
//! and comparator for standalone use.
//!
//! The heap is not stable: equal elements come out in no particular order.

use std::fmt;

use crate::compare::Compare;

// ============================================================================
// Algorithms
// ============================================================================

/// Pushes `value` onto the heap. O(log n).
///
/// ```
/// use nexus_pq::{compare::Natural, heap};
///
/// let mut h = Vec::new();
/// for x in [3, 9, 1] {
///     heap::push(&mut h, x, &Natural);
/// }
/// assert_eq!(heap::peek(&h), Some(&9));
/// ```
#[inline]
pub fn push<T, C: Compare<T>>(heap: &mut Vec<T>, value: T, cmp: &C) {
    heap.push(value);
    let last = heap.len() - 1;
    sift_up(heap, last, cmp);
}

/// Removes and returns the maximum element. O(log n).
///
/// Returns `None` on an empty heap.
///
/// ```
/// use nexus_pq::{compare::Natural, heap};
///
/// let mut h = vec![1, 5, 3];
/// heap::build(&mut h, &Natural);
///
/// assert_eq!(heap::pop(&mut h, &Natural), Some(5));
/// assert_eq!(heap::pop(&mut h, &Natural), Some(3));
/// assert_eq!(heap::pop(&mut h, &Natural), Some(1));
/// assert_eq!(heap::pop(&mut h, &Natural), None);
/// ```
#[inline]
pub fn pop<T, C: Compare<T>>(heap: &mut Vec<T>, cmp: &C) -> Option<T> {
    let last = heap.len().checked_sub(1)?;
    heap.swap(0, last);
    let max = heap.pop();
    sift_down(heap, 0, cmp);
    max
}

/// Returns the maximum element without removing it.
#[inline]
pub fn peek<T>(heap: &[T]) -> Option<&T> {
    heap.first()
}

/// Rearranges an arbitrary slice into a valid heap. O(n).
///
/// Sifts down every internal node, from the last parent back to the root.
pub fn build<T, C: Compare<T>>(heap: &mut [T], cmp: &C) {
    for i in (0..=heap.len() / 2).rev() {
        sift_down(heap, i, cmp);
    }
}

/// Sorts the slice in place into descending order under `cmp`. O(n log n).
///
/// The result is the sequence repeated [`pop`] calls would have produced.
/// Length and storage are preserved.
///
/// Works by building a heap under the reversed comparator and repeatedly
/// moving its root (the current minimum) to the end of a shrinking view, so
/// the tail fills from the smallest element up.
///
/// ```
/// use nexus_pq::{compare::Natural, heap};
///
/// let mut v = [4, 1, 3, 9, 7];
/// heap::sort(&mut v, &Natural);
/// assert_eq!(v, [9, 7, 4, 3, 1]);
/// ```
pub fn sort<T, C: Compare<T>>(heap: &mut [T], cmp: &C) {
    let rev = |a: &T, b: &T| cmp.compare(a, b).reverse();
    build(heap, &rev);

    let mut end = heap.len();
    while end > 1 {
        end -= 1;
        heap.swap(0, end);
        sift_down(&mut heap[..end], 0, &rev);
    }
}

/// Returns `true` if every node ranks greater-or-equal to its children.
pub fn is_heap<T, C: Compare<T>>(heap: &[T], cmp: &C) -> bool {
    (1..heap.len()).all(|i| cmp.greater_or_equal(&heap[(i - 1) / 2], &heap[i]))
}

#[inline]
fn sift_up<T, C: Compare<T>>(heap: &mut [T], mut current: usize, cmp: &C) {
    while current > 0 {
        let parent = (current - 1) / 2;
        if cmp.less_or_equal(&heap[current], &heap[parent]) {
            break;
        }
        heap.swap(current, parent);
        current = parent;
    }
}

#[inline]
fn sift_down<T, C: Compare<T>>(heap: &mut [T], mut current: usize, cmp: &C) {
    let len = heap.len();
    loop {
        let left = 2 * current + 1;
        if left >= len {
            return;
        }

        let right = left + 1;
        let child = if right < len && cmp.greater(&heap[right], &heap[left]) {
            right
        } else {
            left
        };

        if cmp.greater_or_equal(&heap[current], &heap[child]) {
            return;
        }

        heap.swap(current, child);
        current = child;
    }
}

// ============================================================================
// Owning heap
// ============================================================================

/// A binary max-heap that owns its storage and comparator.
///
/// # Example
///
/// ```
/// use nexus_pq::compare::{self, Natural};
/// use nexus_pq::Heap;
///
/// let mut heap = Heap::with_capacity(8, Natural);
/// heap.push(5);
/// heap.push(1);
/// heap.push(8);
///
/// assert_eq!(heap.peek(), Some(&8));
/// assert_eq!(heap.pop(), Some(8));
///
/// // Min-heap: reverse the comparator
/// let mut min = Heap::from_vec(vec![5, 1, 8], compare::reverse(Natural));
/// assert_eq!(min.pop(), Some(1));
/// ```
pub struct Heap<T, C> {
    data: Vec<T>,
    cmp: C,
}

impl<T, C: Compare<T>> Heap<T, C> {
    /// Creates an empty heap.
    pub const fn new(cmp: C) -> Self {
        Self {
            data: Vec::new(),
            cmp,
        }
    }

    /// Creates an empty heap with room for `capacity` elements.
    pub fn with_capacity(capacity: usize, cmp: C) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            cmp,
        }
    }

    /// Builds a heap from an arbitrary vector in O(n).
    pub fn from_vec(mut data: Vec<T>, cmp: C) -> Self {
        build(&mut data, &cmp);
        debug_assert!(is_heap(&data, &cmp));
        Self { data, cmp }
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the heap holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Returns the comparator.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Pushes a value. O(log n).
    #[inline]
    pub fn push(&mut self, value: T) {
        push(&mut self.data, value, &self.cmp);
    }

    /// Removes and returns the maximum element. O(log n).
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        pop(&mut self.data, &self.cmp)
    }

    /// Returns the maximum element without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        peek(&self.data)
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Takes every element out, sorted in descending order, leaving the heap
    /// empty. The heap keeps its comparator but not its allocation.
    pub fn drain_sorted(&mut self) -> Vec<T> {
        let mut out = std::mem::take(&mut self.data);
        sort(&mut out, &self.cmp);
        out
    }

    /// Consumes the heap, returning its elements in descending order.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        sort(&mut self.data, &self.cmp);
        self.data
    }

    /// Consumes the heap, returning the storage in heap order.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns the storage in heap order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T, C: Compare<T> + Default> Default for Heap<T, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<T, C> fmt::Debug for Heap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .finish_non_exhaustive()
    }
}
