use anyhow::{bail, Result};
use tracing::warn;

use crate::config::{
    BubbleOptions, ChartConfig, ComparisonOptions, ComparisonPeriod, HierarchyOptions,
    SeriesOptions, TimeSeriesOptions,
};
use crate::data::{QueryResult, Scalar};
use crate::ir::{
    Bucketing, HierarchyKind, ResolvedAxis, ResolvedBoxPlotConfig, ResolvedBubbleConfig,
    ResolvedComparison, ResolvedConfig, ResolvedCounterConfig, ResolvedHeatmapConfig,
    ResolvedHierarchyConfig, ResolvedSeriesConfig, ResolvedTimeSeries, RollingWindow, SeriesKind,
    DAY_MS,
};
use crate::parser::looks_like_date;

pub const DEFAULT_MIN_BUBBLE_SIZE: f64 = 5.0;
pub const DEFAULT_MAX_BUBBLE_SIZE: f64 = 50.0;
pub const DEFAULT_CUSTOM_PERIOD_DAYS: u32 = 1;
pub const MISSING_CATEGORY: &str = "Unknown";

/// Number of non-null x values inspected when sniffing for a time axis
const TIME_AXIS_SAMPLE: usize = 5;

/// Apply every default for the chart type and return a fully-populated config
pub fn resolve_config(config: &ChartConfig) -> Result<ResolvedConfig> {
    let resolved = match config {
        ChartConfig::Line(opts) => resolve_series(SeriesKind::Line, opts),
        ChartConfig::Bar(opts) => resolve_series(SeriesKind::Bar, opts),
        ChartConfig::Area(opts) => resolve_series(SeriesKind::Area, opts),
        ChartConfig::Scatter(opts) => resolve_series(SeriesKind::Scatter, opts),
        ChartConfig::Counter(opts) => ResolvedConfig::Counter(ResolvedCounterConfig {
            value_column: opts.value_column.clone(),
            date_column: opts.date_column.clone(),
            comparison: opts.comparison.as_ref().map(resolve_comparison),
        }),
        ChartConfig::BoxPlot(opts) => ResolvedConfig::BoxPlot(ResolvedBoxPlotConfig {
            value_column: opts.value_column.clone(),
            category_column: opts.category_column.clone(),
        }),
        ChartConfig::Treemap(opts) => resolve_hierarchy(HierarchyKind::Treemap, opts),
        ChartConfig::Sunburst(opts) => resolve_hierarchy(HierarchyKind::Sunburst, opts),
        ChartConfig::Heatmap(opts) => ResolvedConfig::Heatmap(ResolvedHeatmapConfig {
            x_column: opts.x_column.clone(),
            y_column: opts.y_column.clone(),
            value_column: opts.value_column.clone(),
        }),
        ChartConfig::Bubble(opts) => resolve_bubble(opts)?,
    };
    Ok(resolved)
}

fn resolve_series(kind: SeriesKind, opts: &SeriesOptions) -> ResolvedConfig {
    ResolvedConfig::Series(ResolvedSeriesConfig {
        kind,
        x_column: opts.x_column.clone(),
        y_columns: opts
            .y_columns
            .clone()
            .map(|c| c.into_vec())
            .unwrap_or_default(),
        stacking: opts.stacking.unwrap_or_default(),
        time_series: opts
            .time_series
            .as_ref()
            .map(resolve_time_series)
            .unwrap_or_default(),
    })
}

fn resolve_time_series(opts: &TimeSeriesOptions) -> ResolvedTimeSeries {
    ResolvedTimeSeries {
        bucketing: opts.granularity.map(|granularity| Bucketing {
            granularity,
            aggregation: opts.aggregation.unwrap_or_default(),
        }),
        cumulative: opts.cumulative.unwrap_or(false),
        rolling: opts.rolling.as_ref().map(|r| RollingWindow {
            window: r.window.max(1),
            function: r.function.unwrap_or_default(),
        }),
        comparison: opts.comparison.as_ref().map(resolve_comparison),
    }
}

fn resolve_comparison(opts: &ComparisonOptions) -> ResolvedComparison {
    ResolvedComparison {
        period: opts.period,
        offset_ms: period_offset_ms(opts.period, opts.custom_periods),
        strategy: opts.match_strategy.unwrap_or_default(),
    }
}

/// Fixed offset for each comparison period. Months and years are not
/// calendar-aware: a month is 30 days and a year 365.
pub fn period_offset_ms(period: ComparisonPeriod, custom_periods: Option<u32>) -> i64 {
    let days = match period {
        ComparisonPeriod::Yoy => 365,
        ComparisonPeriod::Mom => 30,
        ComparisonPeriod::Wow => 7,
        ComparisonPeriod::Dod => 1,
        ComparisonPeriod::Custom => i64::from(custom_periods.unwrap_or(DEFAULT_CUSTOM_PERIOD_DAYS)),
    };
    days * DAY_MS
}

fn resolve_hierarchy(kind: HierarchyKind, opts: &HierarchyOptions) -> ResolvedConfig {
    ResolvedConfig::Hierarchy(ResolvedHierarchyConfig {
        kind,
        hierarchy_columns: opts.hierarchy_columns.clone().unwrap_or_default(),
        value_column: opts.value_column.clone(),
        label_column: opts.label_column.clone(),
        placeholder: MISSING_CATEGORY.to_string(),
    })
}

fn resolve_bubble(opts: &BubbleOptions) -> Result<ResolvedConfig> {
    let min_bubble_size = opts.min_bubble_size.unwrap_or(DEFAULT_MIN_BUBBLE_SIZE);
    let max_bubble_size = opts.max_bubble_size.unwrap_or(DEFAULT_MAX_BUBBLE_SIZE);
    if min_bubble_size > max_bubble_size {
        bail!(
            "minBubbleSize ({}) must not exceed maxBubbleSize ({})",
            min_bubble_size,
            max_bubble_size
        );
    }
    Ok(ResolvedConfig::Bubble(ResolvedBubbleConfig {
        x_column: opts.x_column.clone(),
        y_column: opts.y_column.clone(),
        size_column: opts.size_column.clone(),
        color_column: opts.color_column.clone(),
        min_bubble_size,
        max_bubble_size,
    }))
}

/// Look up a configured column by exact name, or fall back to a position.
/// An unknown name resolves to `None` ("no data") rather than an error.
pub fn resolve_column(result: &QueryResult, name: Option<&str>, fallback: usize) -> Option<usize> {
    match name {
        Some(name) => {
            let idx = result.column_index(name);
            if idx.is_none() {
                warn!(column = name, "configured column not found in query result");
            }
            idx
        }
        None if fallback < result.columns.len() => Some(fallback),
        None => None,
    }
}

/// Resolve x and y axis columns. x defaults to the first column, y to the second.
pub fn resolve_axis(result: &QueryResult, x_column: Option<&str>, y_columns: &[String]) -> ResolvedAxis {
    let x_index = resolve_column(result, x_column, 0);
    let x_name = x_column
        .map(str::to_string)
        .or_else(|| x_index.map(|i| result.columns[i].clone()));

    let (y_indices, y_names) = if y_columns.is_empty() {
        match resolve_column(result, None, 1) {
            Some(i) => (vec![Some(i)], vec![result.columns[i].clone()]),
            None => (Vec::new(), Vec::new()),
        }
    } else {
        (
            y_columns
                .iter()
                .map(|name| resolve_column(result, Some(name), 1))
                .collect(),
            y_columns.to_vec(),
        )
    };

    let x_values: Vec<Scalar> = (0..result.rows.len())
        .map(|row| result.cell(row, x_index).clone())
        .collect();
    let is_time_axis = detect_time_axis(&x_values);

    ResolvedAxis {
        x_index,
        x_name,
        y_indices,
        y_names,
        x_values,
        is_time_axis,
    }
}

/// An axis is a time axis when a strict majority of the first few non-null
/// values look like dates.
pub fn detect_time_axis(values: &[Scalar]) -> bool {
    let sample: Vec<&Scalar> = values
        .iter()
        .filter(|v| !v.is_null())
        .take(TIME_AXIS_SAMPLE)
        .collect();
    let date_like = sample.iter().filter(|v| looks_like_date(v)).count();
    !sample.is_empty() && date_like * 2 > sample.len()
}
