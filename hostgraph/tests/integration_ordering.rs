//! Property tests for the ordering guarantees of field series.

use hostgraph::{FieldSeries, Sample};
use proptest::prelude::*;

fn is_non_decreasing(samples: &[Sample]) -> bool {
    samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

proptest! {
    #[test]
    fn prop_series_stays_ordered(timestamps in prop::collection::vec(-1_000i64..1_000, 0..200)) {
        let mut series = FieldSeries::new();
        for ts in timestamps {
            let before = series.to_vec();
            let accepted = series.push(Sample::new(ts, 0.0));

            if accepted {
                prop_assert_eq!(series.len(), before.len() + 1);
            } else {
                // Only samples at or before the oldest one are dropped.
                prop_assert!(before.iter().all(|s| ts <= s.timestamp));
                prop_assert_eq!(series.to_vec(), before);
            }
            prop_assert!(is_non_decreasing(&series.to_vec()));
        }
    }

    #[test]
    fn prop_since_is_exact_suffix(
        timestamps in prop::collection::vec(1i64..500, 1..100),
        since in 1i64..600,
    ) {
        let mut series = FieldSeries::new();
        for ts in timestamps {
            series.push(Sample::new(ts, 0.0));
        }

        let all = series.to_vec();
        let expected: Vec<Sample> = all.iter().copied().filter(|s| s.timestamp >= since).collect();
        prop_assert_eq!(series.since(since), expected);
    }

    #[test]
    fn prop_remove_prefix_keeps_exactly_fresh_samples(
        timestamps in prop::collection::vec(0i64..500, 0..100),
        cutoff in 0i64..600,
    ) {
        let mut series = FieldSeries::new();
        for ts in timestamps {
            series.push(Sample::new(ts, 0.0));
        }

        let before = series.to_vec();
        let removed = series.remove_prefix(cutoff);

        prop_assert_eq!(removed, before.iter().filter(|s| s.timestamp < cutoff).count());
        prop_assert!(series.iter().all(|s| s.timestamp >= cutoff));
        prop_assert_eq!(series.len(), before.len() - removed);
    }
}
