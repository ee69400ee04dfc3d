use std::collections::HashMap;

use crate::bucket::{bucket_start, half_span_ms};
use crate::config::{Granularity, MatchStrategy, RollingFunction};
use crate::data::Scalar;
use crate::ir::{Comparison, ResolvedComparison, RollingWindow, COMPARISON_TOLERANCE_MS};
use crate::parser::parse_date;

/// Running sum in positional order. Nulls contribute 0.
pub fn cumulative(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            total += v.unwrap_or(0.0);
            Some(total)
        })
        .collect()
}

/// Trailing-window reduction. The first `window - 1` positions have too little
/// history and are null. Nulls inside a window count as 0.
pub fn rolling(values: &[Option<f64>], window: RollingWindow) -> Vec<Option<f64>> {
    let p = window.window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < p {
                return None;
            }
            let slice = values[i + 1 - p..=i].iter().map(|v| v.unwrap_or(0.0));
            let reduced = match window.function {
                RollingFunction::Mean => slice.sum::<f64>() / p as f64,
                RollingFunction::Sum => slice.sum(),
                RollingFunction::Min => slice.fold(f64::INFINITY, f64::min),
                RollingFunction::Max => slice.fold(f64::NEG_INFINITY, f64::max),
            };
            Some(reduced)
        })
        .collect()
}

/// Cumulative first, then rolling over the cumulative output.
pub fn apply_transforms(
    values: &[Option<f64>],
    cumulative_enabled: bool,
    window: Option<RollingWindow>,
) -> Vec<Option<f64>> {
    let mut out = if cumulative_enabled {
        cumulative(values)
    } else {
        values.to_vec()
    };
    if let Some(window) = window {
        out = rolling(&out, window);
    }
    out
}

fn changes(current: Option<f64>, previous: Option<f64>) -> Comparison {
    let Some(previous) = previous else {
        return Comparison::default();
    };
    let absolute_change = current.map(|c| c - previous);
    let percent_change = match absolute_change {
        Some(delta) if previous != 0.0 => Some(delta / previous * 100.0),
        _ => None,
    };
    Comparison {
        previous_value: Some(previous),
        absolute_change,
        percent_change,
    }
}

/// Timestamp -> value lookup that remembers first-insertion order.
/// Re-inserting a timestamp replaces its value but keeps its position.
#[derive(Debug, Default)]
struct DatedValues {
    entries: Vec<(i64, Option<f64>)>,
    index: HashMap<i64, usize>,
}

impl DatedValues {
    fn insert(&mut self, ts: i64, value: Option<f64>) {
        match self.index.get(&ts) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(ts, self.entries.len());
                self.entries.push((ts, value));
            }
        }
    }

    fn lookup(&self, target: i64, strategy: MatchStrategy) -> Option<Option<f64>> {
        if let Some(&pos) = self.index.get(&target) {
            return Some(self.entries[pos].1);
        }
        let within = self
            .entries
            .iter()
            .filter(|(ts, _)| ts.abs_diff(target) <= COMPARISON_TOLERANCE_MS.unsigned_abs());
        match strategy {
            MatchStrategy::First => within.map(|(_, v)| *v).next(),
            MatchStrategy::Nearest => within
                .min_by_key(|(ts, _)| ts.abs_diff(target))
                .map(|(_, v)| *v),
        }
    }
}

/// Pair every row with the value one period earlier.
///
/// An exact timestamp match wins; otherwise the tolerance window is searched
/// according to the configured strategy. Rows without a parseable date, or
/// without a historical match, get an all-null comparison.
pub fn compare_periods(
    dates: &[Scalar],
    values: &[Option<f64>],
    comparison: &ResolvedComparison,
) -> Vec<Comparison> {
    let parsed: Vec<Option<i64>> = dates.iter().map(parse_date).collect();

    let mut history = DatedValues::default();
    for (i, ts) in parsed.iter().enumerate() {
        if let Some(ts) = ts {
            history.insert(*ts, values.get(i).copied().flatten());
        }
    }

    parsed
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            let Some(target) = ts.and_then(|ts| ts.checked_sub(comparison.offset_ms)) else {
                return Comparison::default();
            };
            let previous = history.lookup(target, comparison.strategy).flatten();
            changes(values.get(i).copied().flatten(), previous)
        })
        .collect()
}

/// Pair every time bucket with the bucket one period earlier.
///
/// Buckets are identified by their start instants. The lookup goes back from
/// the bucket's midpoint, so uneven month and year lengths still land in the
/// previous bucket. A target inside the same bucket (a period shorter than
/// the granularity) or in a bucket with no data gives an all-null comparison.
pub fn compare_buckets(
    starts: &[i64],
    values: &[Option<f64>],
    granularity: Granularity,
    offset_ms: i64,
) -> Vec<Comparison> {
    let by_start: HashMap<i64, Option<f64>> = starts
        .iter()
        .copied()
        .zip(values.iter().copied())
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let previous = start
                .checked_add(half_span_ms(granularity))
                .and_then(|mid| mid.checked_sub(offset_ms))
                .and_then(|target| bucket_start(target, granularity))
                .filter(|&prev| prev != start)
                .and_then(|prev| by_start.get(&prev).copied().flatten());
            changes(values.get(i).copied().flatten(), previous)
        })
        .collect()
}

/// A dated historical value for single-point comparisons
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalPoint {
    pub date: Scalar,
    pub value: f64,
}

/// Compare one value (e.g. a KPI counter) against the historical point closest
/// to `current_date - offset_ms`, provided it lies within the 12 hour tolerance.
pub fn compare_point(
    current_value: f64,
    current_date: &Scalar,
    history: &[HistoricalPoint],
    offset_ms: i64,
) -> Comparison {
    let Some(target) = parse_date(current_date).and_then(|ts| ts.checked_sub(offset_ms)) else {
        return Comparison::default();
    };

    let best = history
        .iter()
        .filter_map(|p| parse_date(&p.date).map(|ts| (ts.abs_diff(target), p.value)))
        .filter(|(distance, _)| *distance <= COMPARISON_TOLERANCE_MS.unsigned_abs())
        .min_by_key(|(distance, _)| *distance);

    changes(Some(current_value), best.map(|(_, value)| value))
}
