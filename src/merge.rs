//! The adaptive merger: two-galloping search and the `mergeLo`/`mergeHi`
//! variants (spec §4.5), plus the galloping insertion-point search they
//! share (spec §4.5's "Gallop functions").
//!
//! This is the part of the core where the Rust translation deliberately
//! diverges from the teacher's `merging/two_way.rs::Galloping`: the
//! teacher's variant requires a scratch buffer as large as the *whole*
//! combined region and writes the merged result into that buffer before
//! copying it back in one shot. That doesn't satisfy spec §3/§4.6's
//! scratch-buffer contract (`min(n/2, 256)`, grown only as far as the
//! *smaller* run ever needs) or the scratch-growth-boundedness testable
//! property (§8.9). The structure here — copy only the shorter run out,
//! merge the two directly back into the original slice — is the classic
//! TimSort merge (the same one `std::slice`'s internal stable sort, which
//! the teacher's own `BufGuard` doc comment points to, actually uses); the
//! two-galloping search itself, the `count1`/`count2` win-streak
//! bookkeeping, and the `minGallop` adaptation are carried over from the
//! teacher almost line for line.

use crate::error::SortError;
use crate::scratch;
use std::cmp::Ordering;

/// `MIN_GALLOP` from spec §3/§4.5: the win-streak length that triggers
/// (and, while sustained, keeps) galloping mode.
const MIN_GALLOP: usize = 7;

enum GallopMode {
    /// Leftmost `k` such that `slice[..k-1] < key <= slice[k..]`.
    Left,
    /// Rightmost `k` such that `slice[..k] <= key < slice[k..]`.
    Right,
}

/// Locate the insertion point for `key` in sorted `slice`, starting the
/// search from `hint` and probing outward with doubling offsets before
/// binary-searching the located sub-range (spec §4.5's gallop functions).
fn gallop<T>(
    key: &T,
    slice: &[T],
    hint: usize,
    mode: GallopMode,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
) -> usize {
    if slice.is_empty() {
        return 0;
    }
    debug_assert!(hint < slice.len());

    // `pred(x)` is true for exactly the elements that belong strictly to
    // the left of the returned index.
    let pred = |x: &T, cmp: &mut dyn FnMut(&T, &T) -> Ordering| -> bool {
        match mode {
            GallopMode::Left => cmp(x, key) == Ordering::Less,
            GallopMode::Right => cmp(x, key) != Ordering::Greater,
        }
    };

    let mut last_offset;
    let mut offset = 1usize;

    if pred(&slice[hint], cmp) {
        // The boundary is at or after `hint`: gallop forward.
        let max_offset = slice.len() - hint;
        last_offset = 0;
        while offset < max_offset && pred(&slice[hint + offset], cmp) {
            last_offset = offset;
            offset = match offset.checked_shl(1).and_then(|v| v.checked_add(1)) {
                Some(next) if next > 0 => next,
                _ => max_offset,
            };
        }
        offset = offset.min(max_offset);
        last_offset += hint + 1;
        offset += hint;
    } else {
        // The boundary is strictly before `hint`: gallop backward.
        let max_offset = hint + 1;
        last_offset = 0;
        while offset < max_offset && !pred(&slice[hint - offset], cmp) {
            last_offset = offset;
            offset = match offset.checked_shl(1).and_then(|v| v.checked_add(1)) {
                Some(next) if next > 0 => next,
                _ => max_offset,
            };
        }
        offset = offset.min(max_offset);
        let probed = last_offset;
        last_offset = hint + 1 - offset;
        offset = hint - probed;
    }

    debug_assert!(last_offset <= offset && offset <= slice.len());

    // Binary search the located sub-range.
    let mut lo = last_offset;
    let mut hi = offset;
    while lo < hi {
        let mid = lo + ((hi - lo) >> 1);
        if pred(&slice[mid], cmp) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

pub(crate) fn gallop_left<T>(
    key: &T,
    slice: &[T],
    hint: usize,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
) -> usize {
    gallop(key, slice, hint, GallopMode::Left, cmp)
}

pub(crate) fn gallop_right<T>(
    key: &T,
    slice: &[T],
    hint: usize,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
) -> usize {
    gallop(key, slice, hint, GallopMode::Right, cmp)
}

/// Merge the two adjacent, already-sorted runs `slice[..run1_len]` and
/// `slice[run1_len..]` in place. `min_gallop` persists across every merge
/// performed by one top-level sort (spec §3's lifecycle), so the caller
/// threads the same `&mut usize` through the whole sort rather than
/// resetting it per merge.
pub(crate) fn merge_adjacent_runs<T>(
    slice: &mut [T],
    run1_len: usize,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
    scratch: &mut Vec<T>,
    max_scratch_cap: usize,
    min_gallop: &mut usize,
) -> Result<(), SortError> {
    if run1_len == 0 || run1_len == slice.len() {
        return Ok(());
    }

    // Trim: skip the prefix of A that's already known to belong before B.
    let start = gallop_right(&slice[run1_len], &slice[..run1_len], 0, cmp);
    if start == run1_len {
        return Ok(());
    }

    // Trim: skip the suffix of B that's already known to belong after A.
    let b_hint = slice.len() - run1_len - 1;
    let trimmed_len2 = gallop_left(&slice[run1_len - 1], &slice[run1_len..], b_hint, cmp);
    let end = trimmed_len2 + run1_len;
    if end == run1_len {
        return Ok(());
    }

    let working = &mut slice[start..end];
    let len1 = run1_len - start;
    let len2 = working.len() - len1;

    if len1 <= len2 {
        merge_lo(working, len1, cmp, scratch, max_scratch_cap, min_gallop)
    } else {
        merge_hi(working, len1, cmp, scratch, max_scratch_cap, min_gallop)
    }
}

/// A guard that, on early return (including an unwind from a panicking
/// comparator), flushes whatever is left in the scratch copy and/or the
/// still-live source range into `dest` exactly once each — so every
/// original element ends up written into the slice exactly once no matter
/// how the function exits. On the normal-completion path the counts are
/// driven to zero before the guard drops, making the flush a no-op.
struct MergeGuard<T> {
    dest: *mut T,
    scratch_ptr: *const T,
    scratch_rem: usize,
    /// Whether remaining live elements sit *before* `dest` growing upward
    /// (mergeLo) or *after* `dest` growing downward (mergeHi); in the
    /// latter case `live_ptr` points at the *last* remaining element.
    live_ptr: *mut T,
    live_rem: usize,
    descending: bool,
}

impl<T> Drop for MergeGuard<T> {
    fn drop(&mut self) {
        unsafe {
            if !self.descending {
                if self.scratch_rem > 0 {
                    std::ptr::copy_nonoverlapping(self.scratch_ptr, self.dest, self.scratch_rem);
                    self.dest = self.dest.add(self.scratch_rem);
                }
                if self.live_rem > 0 {
                    std::ptr::copy(self.live_ptr, self.dest, self.live_rem);
                }
            } else {
                if self.scratch_rem > 0 {
                    let dest_start = self.dest.sub(self.scratch_rem - 1);
                    std::ptr::copy_nonoverlapping(self.scratch_ptr, dest_start, self.scratch_rem);
                    self.dest = dest_start.sub(1);
                }
                if self.live_rem > 0 {
                    let live_start = self.live_ptr.sub(self.live_rem - 1);
                    let dest_start = self.dest.sub(self.live_rem - 1);
                    std::ptr::copy(live_start, dest_start, self.live_rem);
                }
            }
        }
    }
}

/// Merge `slice[..len1]` (copied out to scratch) with the live
/// `slice[len1..]`, writing ascending into `slice` from the front.
/// Used when `len1 <= len2` (spec §4.5).
fn merge_lo<T>(
    slice: &mut [T],
    len1: usize,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
    scratch: &mut Vec<T>,
    max_cap: usize,
    min_gallop: &mut usize,
) -> Result<(), SortError> {
    let len2 = slice.len() - len1;
    debug_assert!(len1 > 0 && len2 > 0);

    let spare = scratch::ensure_capacity(scratch, len1, max_cap);
    debug_assert!(spare.len() >= len1);
    let scratch_base = spare.as_mut_ptr() as *mut T;

    let slice_ptr = slice.as_mut_ptr();
    unsafe {
        std::ptr::copy_nonoverlapping(slice_ptr, scratch_base, len1);
    }

    let mut guard = MergeGuard {
        dest: slice_ptr,
        scratch_ptr: scratch_base as *const T,
        scratch_rem: len1,
        live_ptr: unsafe { slice_ptr.add(len1) },
        live_rem: len2,
        descending: false,
    };

    if guard.scratch_rem > 1 {
        'outer: loop {
            let mut count1 = 0usize;
            let mut count2 = 0usize;

            loop {
                let a = unsafe { &*guard.scratch_ptr };
                let b = unsafe { &*guard.live_ptr };

                if cmp(b, a) == Ordering::Less {
                    unsafe {
                        std::ptr::copy_nonoverlapping(guard.live_ptr, guard.dest, 1);
                        guard.dest = guard.dest.add(1);
                        guard.live_ptr = guard.live_ptr.add(1);
                    }
                    guard.live_rem -= 1;
                    count2 += 1;
                    count1 = 0;
                    if guard.live_rem == 0 {
                        break 'outer;
                    }
                } else {
                    unsafe {
                        std::ptr::copy_nonoverlapping(guard.scratch_ptr, guard.dest, 1);
                        guard.dest = guard.dest.add(1);
                        guard.scratch_ptr = guard.scratch_ptr.add(1);
                    }
                    guard.scratch_rem -= 1;
                    count1 += 1;
                    count2 = 0;
                    if guard.scratch_rem == 1 {
                        break 'outer;
                    }
                }

                if (count1 | count2) >= *min_gallop {
                    break;
                }
            }

            loop {
                let a_slice =
                    unsafe { std::slice::from_raw_parts(guard.scratch_ptr, guard.scratch_rem) };
                let b = unsafe { &*guard.live_ptr };
                count1 = gallop_right(b, a_slice, 0, cmp);
                if count1 > 0 {
                    unsafe {
                        std::ptr::copy_nonoverlapping(guard.scratch_ptr, guard.dest, count1);
                        guard.dest = guard.dest.add(count1);
                        guard.scratch_ptr = guard.scratch_ptr.add(count1);
                    }
                    guard.scratch_rem -= count1;
                    if guard.scratch_rem <= 1 {
                        break 'outer;
                    }
                }

                unsafe {
                    std::ptr::copy_nonoverlapping(guard.live_ptr, guard.dest, 1);
                    guard.dest = guard.dest.add(1);
                    guard.live_ptr = guard.live_ptr.add(1);
                }
                guard.live_rem -= 1;
                if guard.live_rem == 0 {
                    break 'outer;
                }

                let a = unsafe { &*guard.scratch_ptr };
                let b_slice = unsafe { std::slice::from_raw_parts(guard.live_ptr, guard.live_rem) };
                count2 = gallop_left(a, b_slice, 0, cmp);
                if count2 > 0 {
                    unsafe {
                        std::ptr::copy(guard.live_ptr, guard.dest, count2);
                        guard.dest = guard.dest.add(count2);
                        guard.live_ptr = guard.live_ptr.add(count2);
                    }
                    guard.live_rem -= count2;
                    if guard.live_rem == 0 {
                        break 'outer;
                    }
                }

                unsafe {
                    std::ptr::copy_nonoverlapping(guard.scratch_ptr, guard.dest, 1);
                    guard.dest = guard.dest.add(1);
                    guard.scratch_ptr = guard.scratch_ptr.add(1);
                }
                guard.scratch_rem -= 1;
                if guard.scratch_rem == 1 {
                    break 'outer;
                }

                *min_gallop = min_gallop.saturating_sub(1);

                if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                    break;
                }
            }

            *min_gallop += 2;
        }
    }

    *min_gallop = (*min_gallop).max(1);

    if guard.scratch_rem == 1 {
        unsafe {
            std::ptr::copy(guard.live_ptr, guard.dest, guard.live_rem);
            guard.dest = guard.dest.add(guard.live_rem);
            guard.live_rem = 0;
            std::ptr::copy_nonoverlapping(guard.scratch_ptr, guard.dest, 1);
        }
        guard.scratch_rem = 0;
        Ok(())
    } else if guard.scratch_rem == 0 {
        Err(SortError::ComparatorContractViolated)
    } else {
        debug_assert_eq!(guard.live_rem, 0);
        unsafe {
            std::ptr::copy_nonoverlapping(guard.scratch_ptr, guard.dest, guard.scratch_rem);
        }
        guard.scratch_rem = 0;
        Ok(())
    }
}

/// Merge the live `slice[..len1]` with `slice[len1..]` (copied out to
/// scratch), writing descending into `slice` from the back. Used when
/// `len1 > len2` (spec §4.5) — the mirror image of [`merge_lo`].
///
/// Unlike `merge_lo`'s forward-walking pointers (always safely within the
/// `slice`/scratch allocations, since they only ever advance up to one past
/// the end of their own used region), a naive backward translation here
/// would decrement a pointer past the *start* of the allocation once a
/// side is exhausted — out of bounds in the other direction, which Rust's
/// pointer-arithmetic rules don't forgive the way they forgive "one past
/// the end". So cursors here are plain indices counting down from the top
/// of a fixed base pointer (`base.add(idx)`), never a pointer that itself
/// walks past a boundary.
fn merge_hi<T>(
    slice: &mut [T],
    len1: usize,
    cmp: &mut impl FnMut(&T, &T) -> Ordering,
    scratch: &mut Vec<T>,
    max_cap: usize,
    min_gallop: &mut usize,
) -> Result<(), SortError> {
    let total = slice.len();
    let len2 = total - len1;
    debug_assert!(len1 > 0 && len2 > 0);

    let spare = scratch::ensure_capacity(scratch, len2, max_cap);
    debug_assert!(spare.len() >= len2);
    let scratch_base = spare.as_ptr() as *const T;

    let slice_ptr = slice.as_mut_ptr();
    unsafe {
        std::ptr::copy_nonoverlapping(slice_ptr.add(len1), spare.as_mut_ptr() as *mut T, len2);
    }

    // `live[i]` for `i < live_rem` is `*slice_ptr.add(i)`: the still-live
    // prefix of A. `scratch[i]` for `i < scratch_rem` is
    // `*scratch_base.add(i)`: the copy of B. `dest_rem` counts down the
    // number of slots left to fill, always `live_rem + scratch_rem`.
    let mut live_rem = len1;
    let mut scratch_rem = len2;
    let mut dest_rem = total;
    let mut result = Ok(());

    macro_rules! live_at {
        ($i:expr) => {
            &*slice_ptr.add($i)
        };
    }
    macro_rules! scratch_at {
        ($i:expr) => {
            &*scratch_base.add($i)
        };
    }
    macro_rules! take_live {
        () => {{
            live_rem -= 1;
            dest_rem -= 1;
            unsafe {
                std::ptr::copy_nonoverlapping(slice_ptr.add(live_rem), slice_ptr.add(dest_rem), 1);
            }
        }};
    }
    macro_rules! take_scratch {
        () => {{
            scratch_rem -= 1;
            dest_rem -= 1;
            unsafe {
                std::ptr::copy_nonoverlapping(
                    scratch_base.add(scratch_rem),
                    slice_ptr.add(dest_rem),
                    1,
                );
            }
        }};
    }
    macro_rules! bulk_take_live {
        ($count:expr) => {{
            let count = $count;
            live_rem -= count;
            dest_rem -= count;
            unsafe {
                std::ptr::copy(
                    slice_ptr.add(live_rem),
                    slice_ptr.add(dest_rem),
                    count,
                );
            }
        }};
    }
    macro_rules! bulk_take_scratch {
        ($count:expr) => {{
            let count = $count;
            scratch_rem -= count;
            dest_rem -= count;
            unsafe {
                std::ptr::copy_nonoverlapping(
                    scratch_base.add(scratch_rem),
                    slice_ptr.add(dest_rem),
                    count,
                );
            }
        }};
    }

    'outer: while scratch_rem > 1 && live_rem > 0 {
        let mut count1 = 0usize;
        let mut count2 = 0usize;

        loop {
            let a = unsafe { live_at!(live_rem - 1) };
            let b = unsafe { scratch_at!(scratch_rem - 1) };

            if cmp(b, a) == Ordering::Less {
                take_live!();
                count1 += 1;
                count2 = 0;
                if live_rem == 0 {
                    break 'outer;
                }
            } else {
                take_scratch!();
                count2 += 1;
                count1 = 0;
                if scratch_rem == 1 {
                    break 'outer;
                }
            }

            if (count1 | count2) >= *min_gallop {
                break;
            }
        }

        loop {
            let b = unsafe { scratch_at!(scratch_rem - 1) };
            let a_slice = unsafe { std::slice::from_raw_parts(slice_ptr as *const T, live_rem) };
            let keep = gallop_right(b, a_slice, live_rem - 1, cmp);
            count1 = live_rem - keep;
            if count1 > 0 {
                bulk_take_live!(count1);
                if live_rem == 0 {
                    break 'outer;
                }
            }

            take_scratch!();
            if scratch_rem == 1 {
                break 'outer;
            }

            let a = unsafe { live_at!(live_rem - 1) };
            let b_slice = unsafe { std::slice::from_raw_parts(scratch_base, scratch_rem) };
            let keep2 = gallop_left(a, b_slice, scratch_rem - 1, cmp);
            count2 = scratch_rem - keep2;
            if count2 > 0 {
                bulk_take_scratch!(count2);
                if scratch_rem == 0 {
                    break 'outer;
                }
            }

            take_live!();
            if live_rem == 0 {
                break 'outer;
            }

            *min_gallop = min_gallop.saturating_sub(1);

            if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                break;
            }
        }

        *min_gallop += 2;
    }

    *min_gallop = (*min_gallop).max(1);

    if scratch_rem == 1 {
        if live_rem > 0 {
            unsafe {
                std::ptr::copy(slice_ptr, slice_ptr.add(scratch_rem), live_rem);
            }
        }
        unsafe {
            std::ptr::copy_nonoverlapping(scratch_base, slice_ptr, 1);
        }
    } else if scratch_rem == 0 {
        result = Err(SortError::ComparatorContractViolated);
    } else {
        debug_assert_eq!(live_rem, 0);
        unsafe {
            std::ptr::copy_nonoverlapping(scratch_base, slice_ptr, scratch_rem);
        }
    }

    result
}
