//! An in-place, stable, adaptive merge sort over a user-supplied
//! comparator.
//!
//! The algorithm is the one popularized as "TimSort": detect (and, where
//! too short, extend) naturally-occurring ascending runs, keep a stack of
//! pending runs whose lengths satisfy a decreasing-ish invariant, and merge
//! adjacent runs with a two-way merge that gallops ahead once one side is
//! winning comparisons by a wide enough margin. See the individual modules
//! for the invariants each piece maintains.
//!
//! ```
//! let mut data = vec![5, 3, 1, 4, 1, 5, 9, 2, 6];
//! timsort_core::sort(&mut data).unwrap();
//! assert_eq!(data, [1, 1, 2, 3, 4, 5, 5, 6, 9]);
//! ```

mod error;
mod insertion;
mod merge;
mod run;
mod scratch;
mod sort;
mod stack;

#[cfg(test)]
mod test_support;

pub use error::SortError;

use std::cmp::Ordering;

/// Sort `slice` in ascending order.
///
/// Allocates its own scratch buffer; prefer [`sort_by_with_buffer`] (or the
/// range variants) in a loop to reuse one across calls.
pub fn sort<T: Ord>(slice: &mut [T]) -> Result<(), SortError> {
    sort_by(slice, T::cmp)
}

/// Sort `slice` under a user-supplied comparator.
///
/// `cmp` must define a total pre-order (a == b is allowed; `cmp` must be
/// consistent across repeated calls on the same pair). A comparator that
/// violates this may surface as [`SortError::ComparatorContractViolated`],
/// but that detection isn't guaranteed to catch every possible violation —
/// it only catches the specific mid-merge states that a well-ordered
/// comparator can never produce.
pub fn sort_by<T, F>(slice: &mut [T], mut cmp: F) -> Result<(), SortError>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut scratch = Vec::new();
    sort::timsort(slice, &mut cmp, &mut scratch)
}

/// Like [`sort_by`], but reuses `scratch` as merge workspace instead of
/// allocating fresh space each call. `scratch`'s length is left at `0`
/// (the buffer is used purely for its spare capacity); its capacity may
/// grow, and is never shrunk, across calls.
pub fn sort_by_with_buffer<T, F>(
    slice: &mut [T],
    mut cmp: F,
    scratch: &mut Vec<T>,
) -> Result<(), SortError>
where
    F: FnMut(&T, &T) -> Ordering,
{
    sort::timsort(slice, &mut cmp, scratch)
}

/// Sort `seq[lo..hi]` under `cmp`, leaving the rest of `seq` untouched.
///
/// # Panics
///
/// Panics if `lo > hi` or `hi > seq.len()`.
pub fn sort_range_by<T, F>(seq: &mut [T], lo: usize, hi: usize, cmp: F) -> Result<(), SortError>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut scratch = Vec::new();
    sort_range_by_with_buffer(seq, lo, hi, cmp, &mut scratch)
}

/// Like [`sort_range_by`], but reuses `scratch` as merge workspace.
///
/// # Panics
///
/// Panics if `lo > hi` or `hi > seq.len()`.
pub fn sort_range_by_with_buffer<T, F>(
    seq: &mut [T],
    lo: usize,
    hi: usize,
    mut cmp: F,
    scratch: &mut Vec<T>,
) -> Result<(), SortError>
where
    F: FnMut(&T, &T) -> Ordering,
{
    assert!(lo <= hi, "sort_range_by_with_buffer: lo ({lo}) > hi ({hi})");
    assert!(
        hi <= seq.len(),
        "sort_range_by_with_buffer: hi ({hi}) > seq.len() ({})",
        seq.len()
    );

    sort::timsort(&mut seq[lo..hi], &mut cmp, scratch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_sort_matches_ord() {
        let mut v = vec![5, 3, 1, 4, 1, 5, 9, 2, 6];
        sort(&mut v).unwrap();
        assert_eq!(v, [1, 1, 2, 3, 4, 5, 5, 6, 9]);
    }

    #[test]
    fn public_sort_by_reverse() {
        let mut v = vec![1, 2, 3, 4, 5];
        sort_by(&mut v, |a: &i32, b: &i32| b.cmp(a)).unwrap();
        assert_eq!(v, [5, 4, 3, 2, 1]);
    }

    #[test]
    fn range_variant_leaves_outside_untouched() {
        let mut v = vec![9, 8, 3, 1, 2, 7, 6];
        sort_range_by(&mut v, 2, 5, |a: &i32, b: &i32| a.cmp(b)).unwrap();
        assert_eq!(v, [9, 8, 1, 2, 3, 7, 6]);
    }

    #[test]
    #[should_panic]
    fn range_variant_panics_on_backwards_range() {
        let mut v = vec![1, 2, 3];
        let _ = sort_range_by(&mut v, 2, 1, |a: &i32, b: &i32| a.cmp(b));
    }

    #[test]
    #[should_panic]
    fn range_variant_panics_on_out_of_bounds_hi() {
        let mut v = vec![1, 2, 3];
        let _ = sort_range_by(&mut v, 0, 4, |a: &i32, b: &i32| a.cmp(b));
    }

    #[test]
    fn buffer_variant_reuses_capacity_across_calls() {
        let mut scratch = Vec::new();
        let mut v1: Vec<i32> = (0..10_000).rev().collect();
        sort_by_with_buffer(&mut v1, |a: &i32, b: &i32| a.cmp(b), &mut scratch).unwrap();
        let cap_after_first = scratch.capacity();
        assert!(cap_after_first > 0);

        let mut v2: Vec<i32> = (0..10_000).rev().collect();
        sort_by_with_buffer(&mut v2, |a: &i32, b: &i32| a.cmp(b), &mut scratch).unwrap();
        assert!(scratch.capacity() >= cap_after_first);
        assert!(v2.is_sorted());
    }
}
