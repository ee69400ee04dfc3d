use std::collections::HashMap;

use crate::data::QueryResult;
use crate::ir::{BoxPlotData, BoxPlotGroup, FiveNumberSummary, ResolvedBoxPlotConfig};
use crate::resolve::{resolve_column, MISSING_CATEGORY};

/// Linear-interpolation percentile over sorted data, `p` in 0..=100.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p / 100.0 * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Five-number summary with 1.5×IQR fences.
///
/// Whiskers are the most extreme values inside the fences, collapsing to
/// Q1/Q3 if nothing is inside. Empty input gives an all-zero summary.
pub fn summarize(values: &[f64]) -> FiveNumberSummary {
    let mut ys: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if ys.is_empty() {
        return FiveNumberSummary::default();
    }
    ys.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&ys, 25.0);
    let median = percentile(&ys, 50.0);
    let q3 = percentile(&ys, 75.0);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let in_bounds = |v: &&f64| **v >= lower_fence && **v <= upper_fence;
    let min = ys.iter().filter(in_bounds).copied().next().unwrap_or(q1);
    let max = ys.iter().rev().filter(in_bounds).copied().next().unwrap_or(q3);

    let outliers: Vec<f64> = ys
        .iter()
        .filter(|&&v| v < lower_fence || v > upper_fence)
        .copied()
        .collect();

    FiveNumberSummary {
        min,
        q1,
        median,
        q3,
        max,
        outliers,
    }
}

/// Group numeric values by category (first-seen order) and summarise each group.
/// Non-numeric values are skipped.
pub fn build_box_plot(result: &QueryResult, config: &ResolvedBoxPlotConfig) -> BoxPlotData {
    let category_idx = config
        .category_column
        .as_deref()
        .and_then(|name| resolve_column(result, Some(name), 0));
    let value_idx = match (&config.value_column, &config.category_column) {
        (Some(name), _) => resolve_column(result, Some(name), 0),
        // With a category column the values default to the second column
        (None, Some(_)) => resolve_column(result, None, 1),
        (None, None) => resolve_column(result, None, 0),
    };

    let single_group = value_idx
        .map(|i| result.columns[i].clone())
        .or_else(|| config.value_column.clone())
        .unwrap_or_default();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();

    for row in 0..result.rows.len() {
        let category = if config.category_column.is_some() {
            result
                .cell(row, category_idx)
                .label()
                .unwrap_or_else(|| MISSING_CATEGORY.to_string())
        } else {
            single_group.clone()
        };
        let Some(value) = result.cell(row, value_idx).as_number() else {
            continue;
        };
        if !groups.contains_key(&category) {
            order.push(category.clone());
        }
        groups.entry(category).or_default().push(value);
    }

    let groups = order
        .into_iter()
        .map(|category| {
            let summary = summarize(groups.get(&category).map(Vec::as_slice).unwrap_or(&[]));
            BoxPlotGroup { category, summary }
        })
        .collect();

    BoxPlotData { groups }
}
