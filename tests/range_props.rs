use proptest::prelude::*;
use rova::error::AssignError;
use rova::math::{bounding_indices, nearest_index};

/// Strictly increasing positions built from positive gaps.
fn positions() -> impl Strategy<Value = Vec<f64>> {
    (-1000.0f64..1000.0, prop::collection::vec(0.001f64..10.0, 1..60)).prop_map(|(start, gaps)| {
        let mut x = start;
        gaps.into_iter()
            .map(|g| {
                x += g;
                x
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn bounds_bracket_exactly_the_window(xs in positions(), a in 0usize..60, b in 0usize..60, pad in 0.0f64..0.0005) {
        let i = a % xs.len();
        let j = b % xs.len();
        let (lo, hi) = (xs[i.min(j)] - pad, xs[i.max(j)] + pad);

        let (first, last) = bounding_indices(&xs, lo, hi).unwrap();
        prop_assert!(first <= last);
        prop_assert!(xs[first..=last].iter().all(|&x| x >= lo && x <= hi));
        if first > 0 {
            prop_assert!(xs[first - 1] < lo);
        }
        if last + 1 < xs.len() {
            prop_assert!(xs[last + 1] > hi);
        }
    }

    #[test]
    fn windows_between_samples_are_empty(xs in positions(), k in 0usize..60) {
        prop_assume!(xs.len() >= 2);
        let k = k % (xs.len() - 1);
        let gap = xs[k + 1] - xs[k];
        let (lo, hi) = (xs[k] + gap * 0.25, xs[k] + gap * 0.75);

        let err = bounding_indices(&xs, lo, hi).unwrap_err();
        prop_assert!(matches!(err, AssignError::EmptySelection { .. }), "unexpected error: {err}");
    }

    #[test]
    fn nearest_index_is_never_beaten(xs in positions(), x in -1100.0f64..1700.0) {
        let i = nearest_index(&xs, x).unwrap();
        let best = xs.iter().map(|p| (p - x).abs()).fold(f64::INFINITY, f64::min);
        prop_assert!(((xs[i] - x).abs() - best).abs() < 1e-9);
    }
}
