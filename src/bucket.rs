use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{Aggregation, Granularity};
use crate::data::Scalar;
use crate::ir::{DAY_MS, HOUR_MS};
use crate::parser::parse_date;

/// Aggregated values keyed by time bucket, sorted by key.
/// `starts` holds each bucket's first instant in UTC epoch ms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buckets {
    pub keys: Vec<String>,
    pub starts: Vec<i64>,
    pub values: Vec<f64>,
}

/// First instant of the bucket containing `dt`.
fn truncate(dt: DateTime<Utc>, granularity: Granularity) -> Option<NaiveDateTime> {
    let date = dt.date_naive();
    let start = match granularity {
        Granularity::Hour => return date.and_hms_opt(dt.hour(), 0, 0),
        Granularity::Day => date,
        // Monday-based weeks: Sunday belongs to the Monday six days earlier
        Granularity::Week => {
            date.checked_sub_signed(Duration::days(i64::from(dt.weekday().num_days_from_monday())))?
        }
        Granularity::Month => NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)?,
        Granularity::Quarter => {
            let first_month = (dt.month() - 1) / 3 * 3 + 1;
            NaiveDate::from_ymd_opt(dt.year(), first_month, 1)?
        }
        Granularity::Year => NaiveDate::from_ymd_opt(dt.year(), 1, 1)?,
    };
    start.and_hms_opt(0, 0, 0)
}

/// Start of the bucket containing `epoch_ms`, in UTC epoch ms.
pub fn bucket_start(epoch_ms: i64, granularity: Granularity) -> Option<i64> {
    let dt = DateTime::from_timestamp_millis(epoch_ms)?;
    truncate(dt, granularity).map(|start| start.and_utc().timestamp_millis())
}

/// Canonical bucket key for an instant. Every format sorts lexicographically
/// in chronological order because dates are limited to years 0..=9999.
pub fn bucket_key(epoch_ms: i64, granularity: Granularity) -> Option<String> {
    let dt = DateTime::from_timestamp_millis(epoch_ms)?;
    let start = truncate(dt, granularity)?;
    let key = match granularity {
        Granularity::Hour => format!(
            "{:04}-{:02}-{:02} {:02}:00",
            start.year(),
            start.month(),
            start.day(),
            start.hour()
        ),
        Granularity::Day | Granularity::Week => {
            format!("{:04}-{:02}-{:02}", start.year(), start.month(), start.day())
        }
        Granularity::Month => format!("{:04}-{:02}", start.year(), start.month()),
        Granularity::Quarter => format!("{:04} Q{}", start.year(), (start.month() + 2) / 3),
        Granularity::Year => format!("{:04}", start.year()),
    };
    Some(key)
}

/// Half the nominal length of a bucket. Adding it to a bucket start lands
/// safely inside the bucket whatever the month or year length.
pub fn half_span_ms(granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Hour => HOUR_MS / 2,
        Granularity::Day => DAY_MS / 2,
        Granularity::Week => 7 * DAY_MS / 2,
        Granularity::Month => 14 * DAY_MS,
        Granularity::Quarter => 45 * DAY_MS,
        Granularity::Year => 182 * DAY_MS,
    }
}

/// Reduce one bucket's values. `values` is never empty.
fn aggregate(values: &[f64], aggregation: Aggregation) -> f64 {
    match aggregation {
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Count => values.len() as f64,
    }
}

/// Group `y` by the time bucket of the parallel `x` value and aggregate.
///
/// Rows whose x value can't be parsed as a date are dropped. Null y values
/// count as 0 (and as one row for `count`).
pub fn bucket_series(
    x: &[Scalar],
    y: &[Option<f64>],
    granularity: Granularity,
    aggregation: Aggregation,
) -> Buckets {
    let mut groups: BTreeMap<String, (i64, Vec<f64>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for (i, x_val) in x.iter().enumerate() {
        let bucket = parse_date(x_val).and_then(|ms| {
            Some((bucket_key(ms, granularity)?, bucket_start(ms, granularity)?))
        });
        let Some((key, start)) = bucket else {
            dropped += 1;
            continue;
        };
        let y_val = y.get(i).copied().flatten().filter(|v| v.is_finite()).unwrap_or(0.0);
        groups.entry(key).or_insert_with(|| (start, Vec::new())).1.push(y_val);
    }

    if dropped > 0 {
        debug!(dropped, ?granularity, "dropped rows with unparseable dates while bucketing");
    }

    let mut buckets = Buckets::default();
    for (key, (start, values)) in groups {
        buckets.values.push(aggregate(&values, aggregation));
        buckets.starts.push(start);
        buckets.keys.push(key);
    }
    buckets
}
