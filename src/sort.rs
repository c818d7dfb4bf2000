//! The top-level driving loop (spec §4.1): walk the slice left to right,
//! detecting/extending natural runs, pushing them onto the pending-run
//! stack, and merging whenever the stack invariants call for it; force-
//! collapse everything at the end.

use std::cmp::Ordering;

use crate::error::SortError;
use crate::insertion::binary_insertion_sort;
use crate::merge::merge_adjacent_runs;
use crate::run::count_run_and_make_ascending;
use crate::scratch;
use crate::stack::{Run, RunStack};

/// Below this length, a single binary insertion sort beats the overhead of
/// run detection and the merge machinery entirely (spec §4.1).
const MIN_MERGE: usize = 32;

/// Compute `minRun` for an array of length `n`: the smallest k such that
/// `n / 2^k <= MIN_MERGE`, rounding up so every produced run is close to a
/// power-of-two fraction of `n` (spec §4.1). The bit trick — fold in the
/// lowest bit of `n` as it's shifted away — is inherited verbatim from the
/// teacher, which carries it from the reference implementation without
/// offering a clean derivation either.
fn min_run_length(mut n: usize) -> usize {
    debug_assert!(n > 0);
    let mut r = 0usize;
    while n >= MIN_MERGE {
        r |= n & 1;
        n >>= 1;
    }
    n + r
}

/// Per-sort-call state: the pending-run stack and the scratch buffer and
/// `min_gallop` threshold the merger adapts over the lifetime of one sort
/// (spec §3). Threading this through rather than recreating it per merge is
/// what makes `min_gallop`'s adaptation actually persist across the whole
/// sort, rather than resetting — unlike the teacher's simplified merge
/// driver, which never tracks `min_gallop` across calls at all.
pub(crate) struct Sorter<'buf, T> {
    stack: RunStack,
    scratch: &'buf mut Vec<T>,
    min_gallop: usize,
    max_scratch_cap: usize,
}

impl<'buf, T> Sorter<'buf, T> {
    fn new(n: usize, scratch: &'buf mut Vec<T>) -> Self {
        let max_scratch_cap = scratch::max_capacity(n);
        scratch::ensure_capacity(scratch, scratch::initial_capacity(n), max_scratch_cap);
        Self {
            stack: RunStack::new(n),
            scratch,
            min_gallop: 7,
            max_scratch_cap,
        }
    }

    fn merge_at(&mut self, slice: &mut [T], run1: Run, run2: Run, cmp: &mut impl FnMut(&T, &T) -> Ordering) -> Result<(), SortError> {
        debug_assert_eq!(run1.base + run1.len, run2.base);
        let region = &mut slice[run1.base..run2.base + run2.len];
        merge_adjacent_runs(
            region,
            run1.len,
            cmp,
            self.scratch,
            self.max_scratch_cap,
            &mut self.min_gallop,
        )
    }
}

/// Sort `slice` in place under `cmp`, using `scratch` as (reusable) merge
/// workspace.
pub(crate) fn timsort<T>(
    slice: &mut [T],
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
    scratch: &mut Vec<T>,
) -> Result<(), SortError> {
    let n = slice.len();
    if n < 2 {
        return Ok(());
    }

    if n < MIN_MERGE {
        let run_len = count_run_and_make_ascending(slice, cmp);
        binary_insertion_sort(slice, run_len, cmp);
        return Ok(());
    }

    let min_run = min_run_length(n);
    let mut sorter = Sorter::new(n, scratch);

    let mut lo = 0usize;
    while lo < n {
        let remaining = &mut slice[lo..];
        let mut run_len = count_run_and_make_ascending(remaining, cmp);

        if run_len < min_run {
            let force = min_run.min(remaining.len());
            binary_insertion_sort(&mut remaining[..force], run_len, cmp);
            run_len = force;
        }

        sorter.stack.push(Run { base: lo, len: run_len });
        lo += run_len;

        while let Some((run1, run2)) = sorter.stack.next_collapse_merge() {
            sorter.merge_at(slice, run1, run2, cmp)?;
        }
    }

    while let Some((run1, run2)) = sorter.stack.next_force_collapse_merge() {
        sorter.merge_at(slice, run1, run2, cmp)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn natural_cmp(a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }

    fn sort_vec(mut v: Vec<i32>) -> Vec<i32> {
        let mut scratch = Vec::new();
        timsort(&mut v, &mut natural_cmp, &mut scratch).unwrap();
        v
    }

    #[test]
    fn min_run_examples_from_spec() {
        // Exact for n < MIN_MERGE; for n == 64 it divides evenly into 4
        // runs of 16. For any n >= MIN_MERGE the result stays in
        // [MIN_MERGE / 2, MIN_MERGE].
        assert_eq!(min_run_length(64), 16);
        assert_eq!(min_run_length(63), 32);
        assert_eq!(min_run_length(32), 16);
        for n in [100usize, 1_000, 1_000_000, 1_234_567] {
            let r = min_run_length(n);
            assert!((16..=32).contains(&r), "minRun({n}) = {r}");
        }
    }

    #[test]
    fn empty_and_singleton_are_no_ops() {
        assert_eq!(sort_vec(vec![]), Vec::<i32>::new());
        assert_eq!(sort_vec(vec![1]), vec![1]);
    }

    #[test]
    fn small_input_uses_the_insertion_sort_fast_path() {
        assert_eq!(sort_vec(vec![5, 3, 1, 4, 2]), vec![1, 2, 3, 4, 5]);
        assert_eq!(sort_vec(vec![5, 4, 3, 2, 1]), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn large_random_input_is_sorted() {
        use rand::Rng;
        use rand::SeedableRng;
        use rand::rngs::SmallRng;

        let mut rng = SmallRng::seed_from_u64(crate::test_support::TEST_SEED);
        let data: Vec<i32> = (0..5_000).map(|_| rng.random_range(-500..500)).collect();
        let sorted = sort_vec(data.clone());
        let mut expected = data;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn many_equal_elements_stay_stable() {
        use crate::test_support::IndexedOrdered;

        let values: Vec<i32> = (0..2_000).map(|i| i % 7).collect();
        let mut tagged: Vec<_> = IndexedOrdered::tag(values.into_iter()).collect();
        let mut scratch = Vec::new();
        timsort(
            &mut tagged,
            &mut |a: &IndexedOrdered<i32>, b: &IndexedOrdered<i32>| a.value.cmp(&b.value),
            &mut scratch,
        )
        .unwrap();
        assert!(IndexedOrdered::is_stable_sorted(&tagged));
    }

    #[test]
    fn reverse_sorted_input_is_handled_in_one_run() {
        let data: Vec<i32> = (0..10_000).rev().collect();
        let sorted = sort_vec(data);
        assert!(sorted.is_sorted());
    }

    #[test]
    fn already_sorted_input_is_idempotent() {
        let data: Vec<i32> = (0..3_000).collect();
        let sorted = sort_vec(data.clone());
        assert_eq!(sorted, data);
    }

    #[test]
    fn contract_violating_comparator_is_reported() {
        use crate::test_support::FlakyComparator;

        let data: Vec<i32> = (0..2_000).map(|i| (i * 37) % 1000).collect();
        let flaky = FlakyComparator::new();
        let mut v = data;
        let mut scratch = Vec::new();
        let result = timsort(&mut v, &mut flaky.compare(997), &mut scratch);
        assert_eq!(result, Err(SortError::ComparatorContractViolated));
    }

    #[test]
    fn scratch_buffer_never_exceeds_half_the_input() {
        let data: Vec<i32> = (0..20_000).rev().collect();
        let mut v = data;
        let mut scratch = Vec::new();
        timsort(&mut v, &mut natural_cmp, &mut scratch).unwrap();
        assert!(scratch.capacity() <= 20_000 / 2);
    }
}
