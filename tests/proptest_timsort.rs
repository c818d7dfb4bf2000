//! Property-based coverage (spec §8): sortedness, permutation-ness, and
//! stability over arbitrary inputs, in the `proptest` style carried in from
//! the `KeplerOps-Blocks` sort crate in the retrieval pack (the teacher
//! itself doesn't use `proptest`, only seeded-RNG unit tests).

use proptest::prelude::*;
use timsort_core::sort_by;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tagged {
    value: i32,
    index: usize,
}

fn tag(values: &[i32]) -> Vec<Tagged> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| Tagged { value, index })
        .collect()
}

fn is_permutation(sorted: &[Tagged], original: &[Tagged]) -> bool {
    let mut a: Vec<_> = sorted.iter().map(|t| t.index).collect();
    let mut b: Vec<_> = original.iter().map(|t| t.index).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

fn is_stable_sorted(tagged: &[Tagged]) -> bool {
    tagged
        .windows(2)
        .all(|w| (w[0].value, w[0].index) <= (w[1].value, w[1].index))
}

proptest! {
    #[test]
    fn sorts_and_preserves_elements(values in prop::collection::vec(any::<i32>(), 0..400)) {
        let mut v = values.clone();
        sort_by(&mut v, |a: &i32, b: &i32| a.cmp(b)).unwrap();
        prop_assert!(v.is_sorted());

        let mut expected = values;
        expected.sort();
        prop_assert_eq!(v, expected);
    }

    #[test]
    fn is_stable_under_a_low_cardinality_key(
        values in prop::collection::vec(0i32..6, 0..400)
    ) {
        let tagged = tag(&values);
        let mut sorted = tagged.clone();
        sort_by(&mut sorted, |a: &Tagged, b: &Tagged| a.value.cmp(&b.value)).unwrap();

        prop_assert!(is_stable_sorted(&sorted));
        prop_assert!(is_permutation(&sorted, &tagged));
    }

    #[test]
    fn idempotent_when_sorted_twice(values in prop::collection::vec(any::<i16>(), 0..400)) {
        let mut once: Vec<i16> = values;
        sort_by(&mut once, |a: &i16, b: &i16| a.cmp(b)).unwrap();
        let mut twice = once.clone();
        sort_by(&mut twice, |a: &i16, b: &i16| a.cmp(b)).unwrap();
        prop_assert_eq!(once, twice);
    }
}
