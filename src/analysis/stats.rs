//! Descriptive statistics over grade sequences.
//!
//! Every function accepts empty input. Empty means and medians are 0 rather
//! than an error so a class with no data renders as zeros instead of failing;
//! callers that must distinguish "no data" check for emptiness first (the
//! aggregator does, and raises `EmptyDataset` / `NoGrades`).
//!
//! Nothing here rounds except [`stddev_sample`] and [`round2`]; callers round
//! once when they build a presentation value.

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean, 0 for empty input.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Median, 0 for empty input. Even counts average the two middle values.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }

    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Sample standard deviation (divides by n - 1), rounded to two decimals.
///
/// Fewer than two points have no sample deviation and yield 0.
pub fn stddev_sample(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }

    let m = mean(xs);
    let sum_of_squares: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();

    round2((sum_of_squares / (xs.len() - 1) as f64).sqrt())
}

/// Largest value, 0 for empty input.
pub fn max(xs: &[f64]) -> f64 {
    xs.iter()
        .copied()
        .max_by(f64::total_cmp)
        .unwrap_or(0.0)
}

/// Smallest value, 0 for empty input.
pub fn min(xs: &[f64]) -> f64 {
    xs.iter()
        .copied()
        .min_by(f64::total_cmp)
        .unwrap_or(0.0)
}

/// Stable sort, highest score first. Equal scores keep their input order.
pub fn rank_desc<T, F>(items: &[T], score: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let mut ranked = items.to_vec();
    ranked.sort_by(|a, b| score(b).total_cmp(&score(a)));
    ranked
}

/// Stable sort, lowest score first. Equal scores keep their input order.
pub fn rank_asc<T, F>(items: &[T], score: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let mut ranked = items.to_vec();
    ranked.sort_by(|a, b| score(a).total_cmp(&score(b)));
    ranked
}

/// First element of [`rank_desc`].
pub fn best<T, F>(items: &[T], score: F) -> Option<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    rank_desc(items, score).into_iter().next()
}

/// Last element of [`rank_desc`].
pub fn worst<T, F>(items: &[T], score: F) -> Option<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    rank_desc(items, score).pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: u64,
        score: f64,
    }

    fn entry(id: u64, score: f64) -> Entry {
        Entry { id, score }
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[9.0, 1.0, 5.0]), 5.0);
    }

    #[test]
    fn test_empty_inputs_yield_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(stddev_sample(&[]), 0.0);
        assert_eq!(max(&[]), 0.0);
        assert_eq!(min(&[]), 0.0);
    }

    #[test]
    fn test_stddev_single_point_is_zero() {
        assert_eq!(stddev_sample(&[5.0]), 0.0);
    }

    #[test]
    fn test_stddev_is_sample_not_population() {
        // Population deviation of this set is exactly 2.0.
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(stddev_sample(&xs), 2.14);
    }

    #[test]
    fn test_mean_is_not_rounded() {
        let m = mean(&[1.0, 1.0, 2.0]);
        assert!((m - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(round2(m), 1.33);
    }

    #[test]
    fn test_rank_desc_keeps_input_order_for_ties() {
        let ranked = rank_desc(&[entry(1, 80.0), entry(2, 80.0)], |e| e.score);
        assert_eq!(ranked, vec![entry(1, 80.0), entry(2, 80.0)]);

        let ranked = rank_desc(
            &[entry(3, 50.0), entry(1, 90.0), entry(2, 90.0)],
            |e| e.score,
        );
        let ids: Vec<u64> = ranked.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_best_and_worst() {
        let items = [entry(1, 70.0), entry(2, 95.0), entry(3, 40.0)];
        assert_eq!(best(&items, |e| e.score).map(|e| e.id), Some(2));
        assert_eq!(worst(&items, |e| e.score).map(|e| e.id), Some(3));
    }

    #[test]
    fn test_best_and_worst_of_empty_are_none() {
        let items: [Entry; 0] = [];
        assert!(best(&items, |e| e.score).is_none());
        assert!(worst(&items, |e| e.score).is_none());
    }

    #[test]
    fn test_single_item_is_both_best_and_worst() {
        let items = [entry(7, 60.0)];
        assert_eq!(best(&items, |e| e.score), worst(&items, |e| e.score));
    }

    #[test]
    fn test_rank_asc_keeps_input_order_for_ties() {
        let ranked = rank_asc(&[entry(1, 40.0), entry(2, 40.0), entry(3, 10.0)], |e| e.score);
        let ids: Vec<u64> = ranked.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn grades() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..=100.0, 1..64)
    }

    proptest! {
        #[test]
        fn median_is_middle_of_sorted(xs in grades()) {
            let mut sorted = xs.clone();
            sorted.sort_by(f64::total_cmp);
            let n = sorted.len();
            let expected = if n % 2 == 1 {
                sorted[n / 2]
            } else {
                (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
            };
            prop_assert_eq!(median(&xs), expected);
        }

        #[test]
        fn median_and_mean_within_bounds(xs in grades()) {
            let lo = min(&xs);
            let hi = max(&xs);
            let med = median(&xs);
            let avg = mean(&xs);
            prop_assert!(med >= lo && med <= hi);
            prop_assert!(avg >= lo - 1e-9 && avg <= hi + 1e-9);
        }

        #[test]
        fn stddev_is_non_negative(xs in grades()) {
            prop_assert!(stddev_sample(&xs) >= 0.0);
        }

        #[test]
        fn stddev_of_constant_is_zero(value in 0.0f64..=100.0, n in 1usize..32) {
            let xs = vec![value; n];
            prop_assert_eq!(stddev_sample(&xs), 0.0);
        }

        #[test]
        fn rank_desc_is_stable_and_ordered(scores in prop::collection::vec(0u8..=10, 0..48)) {
            let items: Vec<(usize, f64)> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (i, f64::from(*s) * 10.0))
                .collect();
            let ranked = rank_desc(&items, |item| item.1);

            prop_assert_eq!(ranked.len(), items.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
        }

        #[test]
        fn ranking_is_deterministic(scores in prop::collection::vec(0.0f64..=100.0, 0..32)) {
            let items: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
            prop_assert_eq!(rank_desc(&items, |i| i.1), rank_desc(&items, |i| i.1));
        }
    }
}
