//! Pluggable total orders.
//!
//! Every heap and queue in this crate is driven by a [`Compare`] rather than
//! by `T: Ord`, so the same element type can be ordered several ways and a
//! max-heap becomes a min-heap by wrapping the comparator in [`Reversed`].
//!
//! ```
//! use nexus_pq::compare::{self, Compare, Natural};
//! use std::cmp::Ordering;
//!
//! assert!(Natural.less(&1, &2));
//! assert!(compare::reverse(Natural).less(&2, &1));
//!
//! // Any `Fn(&T, &T) -> Ordering` is a comparator.
//! let by_len = |a: &&str, b: &&str| a.len().cmp(&b.len());
//! assert!(by_len.greater(&"three", &"one"));
//! assert_eq!(by_len.compare(&"one", &"two"), Ordering::Equal);
//! ```
//!
//! A comparator must be a consistent weak ordering for the lifetime of the
//! structure using it, and must be a pure function of its inputs: queues call
//! it from whichever thread holds the lock.

use std::cmp::Ordering;

/// A three-way comparison over `T`.
///
/// Only [`compare`](Compare::compare) is required. The six relations are
/// defined purely by the sign it returns.
pub trait Compare<T: ?Sized> {
    /// Orders `a` relative to `b`.
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// `a < b`
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_lt()
    }

    /// `a > b`
    #[inline]
    fn greater(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_gt()
    }

    /// `a == b`
    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_eq()
    }

    /// `a != b`
    #[inline]
    fn not_equal(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_ne()
    }

    /// `a <= b`
    #[inline]
    fn less_or_equal(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_le()
    }

    /// `a >= b`
    #[inline]
    fn greater_or_equal(&self, a: &T, b: &T) -> bool {
        self.compare(a, b).is_ge()
    }

    /// The comparison as `-1`, `0` or `1`.
    #[inline]
    fn sign(&self, a: &T, b: &T) -> i32 {
        self.compare(a, b) as i32
    }
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// The natural order of `T: Ord`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord + ?Sized> Compare<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// A comparator with all signs negated.
///
/// Turns the crate's max-heaps into min-heaps without touching the heap
/// algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reversed<C>(pub C);

/// Returns `cmp` with every sign negated.
#[inline]
pub const fn reverse<C>(cmp: C) -> Reversed<C> {
    Reversed(cmp)
}

impl<C> Reversed<C> {
    /// Returns the wrapped comparator.
    pub fn into_inner(self) -> C {
        self.0
    }
}

impl<T: ?Sized, C: Compare<T>> Compare<T> for Reversed<C> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(a, b).reverse()
    }
}

/// Numeric three-way comparison from `<`, `==` and `>`.
///
/// Returns `-1`, `0` or `1`. Works for any `PartialOrd` type; incomparable
/// pairs (a `NaN` operand) report `0`, so callers ordering floats should
/// make sure `NaN` never enters the structure.
///
/// ```
/// use nexus_pq::compare::natural_order;
///
/// assert_eq!(natural_order(&2, &3), -1);
/// assert_eq!(natural_order(&3, &2), 1);
/// assert_eq!(natural_order(&2.5, &2.5), 0);
/// ```
#[inline]
pub fn natural_order<T: PartialOrd + ?Sized>(a: &T, b: &T) -> i32 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_matches_ord() {
        assert_eq!(Natural.compare(&2, &3), Ordering::Less);
        assert_eq!(Natural.compare(&3, &2), Ordering::Greater);
        assert_eq!(Natural.compare(&2, &2), Ordering::Equal);
    }

    #[test]
    fn sign_is_minus_one_zero_one() {
        assert_eq!(Natural.sign(&2, &3), -1);
        assert_eq!(Natural.sign(&3, &2), 1);
        assert_eq!(Natural.sign(&2, &2), 0);
    }

    #[test]
    fn derived_relations() {
        let c = Natural;

        assert!(c.less(&2, &3));
        assert!(!c.less(&3, &2));
        assert!(!c.less(&2, &2));

        assert!(c.greater(&3, &2));
        assert!(!c.greater(&2, &3));

        assert!(c.equal(&2, &2));
        assert!(!c.equal(&2, &3));

        assert!(c.not_equal(&2, &3));
        assert!(!c.not_equal(&2, &2));

        assert!(c.less_or_equal(&2, &3));
        assert!(c.less_or_equal(&2, &2));
        assert!(!c.less_or_equal(&3, &2));

        assert!(c.greater_or_equal(&3, &2));
        assert!(c.greater_or_equal(&2, &2));
        assert!(!c.greater_or_equal(&2, &3));
    }

    #[test]
    fn reversed_negates() {
        let rev = reverse(Natural);
        assert_eq!(rev.sign(&2, &3), 1);
        assert_eq!(rev.sign(&3, &2), -1);
        assert_eq!(rev.sign(&2, &2), 0);
    }

    #[test]
    fn double_reverse_is_identity() {
        let c = Reversed(Reversed(Natural));
        for (a, b) in [(1, 2), (2, 1), (5, 5)] {
            assert_eq!(c.compare(&a, &b), Natural.compare(&a, &b));
        }
        assert_eq!(c.into_inner().into_inner(), Natural);
    }

    #[test]
    fn closure_comparator() {
        #[derive(Debug)]
        struct Job {
            priority: u8,
        }

        let by_priority = |a: &Job, b: &Job| a.priority.cmp(&b.priority);
        let lo = Job { priority: 1 };
        let hi = Job { priority: 9 };

        assert!(by_priority.less(&lo, &hi));
        assert!(reverse(by_priority).less(&hi, &lo));
    }

    #[test]
    fn unsized_operands() {
        assert!(Natural.less("apple", "banana"));
        assert!(Natural.greater(&[3u8][..], &[1u8, 2][..]));
    }

    #[test]
    fn natural_order_numeric() {
        assert_eq!(natural_order(&2, &3), -1);
        assert_eq!(natural_order(&3, &2), 1);
        assert_eq!(natural_order(&2, &2), 0);
        assert_eq!(natural_order(&1.0, &f64::NAN), 0);
    }
}
