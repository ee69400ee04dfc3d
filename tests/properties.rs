use proptest::prelude::*;

use querychart::bucket::bucket_series;
use querychart::config::{Aggregation, ComparisonPeriod, Granularity, MatchStrategy, RollingFunction};
use querychart::data::Scalar;
use querychart::ir::{ResolvedComparison, RollingWindow, Series};
use querychart::resolve::period_offset_ms;
use querychart::stack::percent_stack;
use querychart::stats::summarize;
use querychart::timeseries::{compare_buckets, compare_periods, rolling};

// 1970-01-01 .. roughly 2096
const MAX_MS: i64 = 4_000_000_000_000;

fn period() -> impl Strategy<Value = ComparisonPeriod> {
    prop_oneof![
        Just(ComparisonPeriod::Yoy),
        Just(ComparisonPeriod::Mom),
        Just(ComparisonPeriod::Wow),
        Just(ComparisonPeriod::Dod),
    ]
}

fn granularity() -> impl Strategy<Value = Granularity> {
    prop_oneof![
        Just(Granularity::Hour),
        Just(Granularity::Day),
        Just(Granularity::Week),
        Just(Granularity::Month),
        Just(Granularity::Quarter),
        Just(Granularity::Year),
    ]
}

proptest! {
    #[test]
    fn bucket_keys_are_strictly_ascending(
        points in prop::collection::vec((0..MAX_MS, -1000.0..1000.0f64), 0..40),
        granularity in granularity(),
    ) {
        let x: Vec<Scalar> = points.iter().map(|(ms, _)| Scalar::Timestamp(*ms)).collect();
        let y: Vec<Option<f64>> = points.iter().map(|(_, v)| Some(*v)).collect();
        let buckets = bucket_series(&x, &y, granularity, Aggregation::Sum);

        prop_assert_eq!(buckets.keys.len(), buckets.values.len());
        prop_assert!(buckets.keys.windows(2).all(|w| w[0] < w[1]));

        let input: f64 = y.iter().flatten().sum();
        let output: f64 = buckets.values.iter().sum();
        prop_assert!((input - output).abs() < 1e-6);
    }

    #[test]
    fn any_numeric_axis_buckets_and_compares(
        xs in prop::collection::vec(any::<f64>(), 0..20),
        granularity in granularity(),
        period in period(),
    ) {
        let x: Vec<Scalar> = xs.iter().map(|n| Scalar::Number(*n)).collect();
        let y: Vec<Option<f64>> = xs.iter().map(|_| Some(1.0)).collect();
        let buckets = bucket_series(&x, &y, granularity, Aggregation::Sum);
        prop_assert!(buckets.keys.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(buckets.starts.windows(2).all(|w| w[0] < w[1]));

        let offset_ms = period_offset_ms(period, None);
        let totals: Vec<Option<f64>> = buckets.values.iter().copied().map(Some).collect();
        let bucketed = compare_buckets(&buckets.starts, &totals, granularity, offset_ms);
        prop_assert_eq!(bucketed.len(), buckets.keys.len());

        let comparison = ResolvedComparison { period, offset_ms, strategy: MatchStrategy::Nearest };
        prop_assert_eq!(compare_periods(&x, &y, &comparison).len(), x.len());
    }

    #[test]
    fn bucket_count_matches_row_count(
        stamps in prop::collection::vec(0..MAX_MS, 0..40),
        granularity in granularity(),
    ) {
        let x: Vec<Scalar> = stamps.iter().map(|ms| Scalar::Timestamp(*ms)).collect();
        let y = vec![None; x.len()];
        let buckets = bucket_series(&x, &y, granularity, Aggregation::Count);
        let counted: f64 = buckets.values.iter().sum();
        prop_assert_eq!(counted as usize, stamps.len());
    }

    #[test]
    fn rolling_has_window_minus_one_leading_nulls(
        values in prop::collection::vec(prop::option::of(-100.0..100.0f64), 0..30),
        window in 1usize..10,
    ) {
        let out = rolling(&values, RollingWindow { window, function: RollingFunction::Mean });
        prop_assert_eq!(out.len(), values.len());

        let leading = (window - 1).min(values.len());
        prop_assert!(out[..leading].iter().all(Option::is_none));
        prop_assert!(out[leading..].iter().all(Option::is_some));
    }

    #[test]
    fn percent_stack_positions_sum_to_100_or_0(
        rows in prop::collection::vec(prop::collection::vec(0.0..1000.0f64, 3), 1..4),
    ) {
        let series: Vec<Series> = rows
            .iter()
            .enumerate()
            .map(|(i, values)| Series {
                name: format!("s{}", i),
                values: values.iter().copied().map(Some).collect(),
            })
            .collect();
        let stacked = percent_stack(&series);

        for pos in 0..3 {
            let total: f64 = stacked.iter().map(|s| s.values[pos].unwrap_or(0.0)).sum();
            prop_assert!((total - 100.0).abs() < 1e-6 || total == 0.0);
        }
    }

    #[test]
    fn summary_is_ordered(values in prop::collection::vec(-1e6..1e6f64, 1..50)) {
        let s = summarize(&values);
        // Whiskers may sit inside the box when the tail is all outliers,
        // so only the quartiles are ordered.
        prop_assert!(s.q1 <= s.median);
        prop_assert!(s.median <= s.q3);
        prop_assert!(s.min <= s.max);
        prop_assert!(values.iter().all(|v| *v >= s.min && *v <= s.max || s.outliers.contains(v)));
    }
}
