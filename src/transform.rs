use anyhow::{Context, Result};
use tracing::debug;

use crate::bucket::{bucket_series, Buckets};
use crate::config::{ChartConfig, Granularity};
use crate::data::{QueryResult, Scalar};
use crate::grid::{build_bubbles, build_heatmap};
use crate::hierarchy::build_hierarchy;
use crate::ir::{
    ChartData, CounterData, ResolvedConfig, ResolvedCounterConfig, ResolvedSeriesConfig, Series,
    SeriesChartData, SeriesComparison,
};
use crate::parser::parse_date;
use crate::resolve::{resolve_axis, resolve_column, resolve_config};
use crate::series::extract_series;
use crate::stack::apply_stacking;
use crate::stats::build_box_plot;
use crate::timeseries::{
    apply_transforms, compare_buckets, compare_periods, compare_point, HistoricalPoint,
};

/// Main entry point: turn a query result and a widget's chart configuration
/// into chart-ready data.
///
/// Only structurally invalid input (rows that disagree with the column count)
/// is an error. Missing columns and unparseable values degrade to empty or
/// null output.
pub fn apply_transformations(result: &QueryResult, config: &ChartConfig) -> Result<ChartData> {
    result.validate().context("Query result is malformed")?;
    let resolved = resolve_config(config)?;
    Ok(apply_resolved(result, &resolved))
}

/// Run the pipeline for an already-resolved configuration. Assumes `result`
/// has been validated.
pub fn apply_resolved(result: &QueryResult, config: &ResolvedConfig) -> ChartData {
    debug!(
        rows = result.rows.len(),
        columns = result.columns.len(),
        "transforming query result"
    );
    match config {
        ResolvedConfig::Series(cfg) => ChartData::Series(process_series(result, cfg)),
        ResolvedConfig::Counter(cfg) => ChartData::Counter(process_counter(result, cfg)),
        ResolvedConfig::BoxPlot(cfg) => ChartData::BoxPlot(build_box_plot(result, cfg)),
        ResolvedConfig::Hierarchy(cfg) => ChartData::Hierarchy {
            kind: cfg.kind,
            data: build_hierarchy(result, cfg),
        },
        ResolvedConfig::Heatmap(cfg) => ChartData::Heatmap(build_heatmap(result, cfg)),
        ResolvedConfig::Bubble(cfg) => ChartData::Bubble(build_bubbles(result, cfg)),
    }
}

/// Line/bar/area/scatter pipeline:
/// axis -> series -> [bucket] -> [compare] -> [cumulative -> rolling] -> stacking
fn process_series(result: &QueryResult, cfg: &ResolvedSeriesConfig) -> SeriesChartData {
    // 1. Resolve axes and project rows
    let axis = resolve_axis(result, cfg.x_column.as_deref(), &cfg.y_columns);
    let mut series = extract_series(result, &axis);
    let mut x = axis.x_values.clone();
    let ts = &cfg.time_series;

    // 2. Time bucketing (only meaningful on a time axis)
    let mut bucketed: Option<(Vec<i64>, Granularity)> = None;
    if let Some(bucketing) = ts.bucketing {
        if axis.is_time_axis {
            let mut layout = Buckets::default();
            series = series
                .into_iter()
                .map(|s| {
                    let buckets =
                        bucket_series(&x, &s.values, bucketing.granularity, bucketing.aggregation);
                    let values = buckets.values.iter().copied().map(Some).collect();
                    layout = buckets;
                    Series { name: s.name, values }
                })
                .collect();
            // Bucket keys depend only on x, so every series shares them
            if series.is_empty() {
                layout = bucket_series(&x, &[], bucketing.granularity, bucketing.aggregation);
            }
            debug!(
                buckets = layout.keys.len(),
                granularity = ?bucketing.granularity,
                "bucketed series"
            );
            x = layout.keys.into_iter().map(Scalar::Text).collect();
            bucketed = Some((layout.starts, bucketing.granularity));
        } else {
            debug!(x = ?axis.x_name, "x axis is not a time axis, skipping bucketing");
        }
    }

    // 3. Period-over-period comparison on the bucketed values
    let comparisons = match &ts.comparison {
        Some(cmp) => series
            .iter()
            .map(|s| SeriesComparison {
                name: s.name.clone(),
                points: match &bucketed {
                    Some((starts, granularity)) => {
                        compare_buckets(starts, &s.values, *granularity, cmp.offset_ms)
                    }
                    None => compare_periods(&x, &s.values, cmp),
                },
            })
            .collect(),
        None => Vec::new(),
    };

    // 4. Cumulative, then rolling
    if ts.cumulative || ts.rolling.is_some() {
        for s in &mut series {
            s.values = apply_transforms(&s.values, ts.cumulative, ts.rolling);
        }
    }

    // 5. Stacking
    let series = apply_stacking(series, cfg.stacking);

    SeriesChartData {
        kind: cfg.kind,
        x,
        series,
        is_time_axis: axis.is_time_axis,
        stacking: cfg.stacking,
        comparisons,
    }
}

/// KPI counter: the latest dated value, optionally compared one period back.
fn process_counter(result: &QueryResult, cfg: &ResolvedCounterConfig) -> CounterData {
    let has_pair = result.columns.len() > 1;
    let date_idx = match &cfg.date_column {
        Some(name) => resolve_column(result, Some(name), 0),
        None if has_pair => Some(0),
        None => None,
    };
    let value_idx = match &cfg.value_column {
        Some(name) => resolve_column(result, Some(name), 0),
        None => resolve_column(result, None, if has_pair { 1 } else { 0 }),
    };

    let dated: Vec<(usize, i64)> = (0..result.rows.len())
        .filter_map(|row| parse_date(result.cell(row, date_idx)).map(|ts| (row, ts)))
        .collect();

    // Latest date wins; ties go to the later row
    let Some(&(current_row, _)) = dated
        .iter()
        .fold(None, |best: Option<&(usize, i64)>, entry| match best {
            Some(b) if b.1 > entry.1 => Some(b),
            _ => Some(entry),
        })
    else {
        let value = result
            .rows
            .len()
            .checked_sub(1)
            .and_then(|last| result.cell(last, value_idx).as_number());
        return CounterData {
            value,
            date: None,
            comparison: None,
        };
    };

    let value = result.cell(current_row, value_idx).as_number();
    let date = result.cell(current_row, date_idx).clone();

    let comparison = match (&cfg.comparison, value) {
        (Some(cmp), Some(current)) => {
            let history: Vec<HistoricalPoint> = dated
                .iter()
                .filter(|(row, _)| *row != current_row)
                .filter_map(|&(row, _)| {
                    result.cell(row, value_idx).as_number().map(|value| HistoricalPoint {
                        date: result.cell(row, date_idx).clone(),
                        value,
                    })
                })
                .collect();
            Some(compare_point(current, &date, &history, cmp.offset_ms))
        }
        _ => None,
    };

    CounterData {
        value,
        date: Some(date),
        comparison,
    }
}
