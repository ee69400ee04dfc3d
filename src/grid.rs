use std::collections::HashMap;

use crate::data::{coerce_or_zero, QueryResult};
use crate::ir::{
    BubbleData, BubbleGroup, BubblePoint, HeatmapCell, HeatmapData, ResolvedBubbleConfig,
    ResolvedHeatmapConfig,
};
use crate::resolve::{resolve_column, MISSING_CATEGORY};

/// De-duplicates labels while keeping first-seen order.
#[derive(Debug, Default)]
struct CategoryIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CategoryIndex {
    fn position(&mut self, label: String) -> usize {
        if let Some(&pos) = self.positions.get(&label) {
            return pos;
        }
        let pos = self.labels.len();
        self.positions.insert(label.clone(), pos);
        self.labels.push(label);
        pos
    }
}

/// Build a category × category matrix. Categories are ordered by first
/// appearance, not sorted. Min/max cover every cell value (0 when empty).
pub fn build_heatmap(result: &QueryResult, config: &ResolvedHeatmapConfig) -> HeatmapData {
    let x_idx = resolve_column(result, config.x_column.as_deref(), 0);
    let y_idx = resolve_column(result, config.y_column.as_deref(), 1);
    let value_idx = resolve_column(result, config.value_column.as_deref(), 2);

    let mut xs = CategoryIndex::default();
    let mut ys = CategoryIndex::default();
    let mut cells = Vec::with_capacity(result.rows.len());
    let mut range: Option<(f64, f64)> = None;

    for row in 0..result.rows.len() {
        let label = |col| {
            result
                .cell(row, col)
                .label()
                .unwrap_or_else(|| MISSING_CATEGORY.to_string())
        };
        let x = xs.position(label(x_idx));
        let y = ys.position(label(y_idx));
        let value = coerce_or_zero(result.cell(row, value_idx));

        range = Some(match range {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
        cells.push(HeatmapCell { x, y, value });
    }

    let (min, max) = range.unwrap_or((0.0, 0.0));
    HeatmapData {
        x_categories: xs.labels,
        y_categories: ys.labels,
        cells,
        min,
        max,
    }
}

/// Linear map of `value` from the observed size range into `[min_px, max_px]`.
/// A zero-width observed range maps everything to `min_px`.
pub fn scale_size(value: f64, observed: (f64, f64), min_px: f64, max_px: f64) -> f64 {
    let (lo, hi) = observed;
    let span = hi - lo;
    let span = if span == 0.0 { 1.0 } else { span };
    min_px + (value - lo) / span * (max_px - min_px)
}

/// Group points by the optional color column and scale bubble radii.
///
/// The observed size range spans all rows so radii are comparable between groups.
pub fn build_bubbles(result: &QueryResult, config: &ResolvedBubbleConfig) -> BubbleData {
    let x_idx = resolve_column(result, config.x_column.as_deref(), 0);
    let y_idx = resolve_column(result, config.y_column.as_deref(), 1);
    let size_idx = resolve_column(result, config.size_column.as_deref(), 2);
    let color_idx = config
        .color_column
        .as_deref()
        .and_then(|name| resolve_column(result, Some(name), 0));

    let sizes: Vec<f64> = (0..result.rows.len())
        .map(|row| coerce_or_zero(result.cell(row, size_idx)))
        .collect();
    let observed = sizes.iter().fold(None, |acc: Option<(f64, f64)>, &s| {
        Some(match acc {
            Some((lo, hi)) => (lo.min(s), hi.max(s)),
            None => (s, s),
        })
    });
    let observed = observed.unwrap_or((0.0, 0.0));

    let default_group = config
        .size_column
        .clone()
        .or_else(|| size_idx.map(|i| result.columns[i].clone()))
        .unwrap_or_default();

    let mut names = CategoryIndex::default();
    let mut groups: Vec<BubbleGroup> = Vec::new();

    for (row, &size) in sizes.iter().enumerate() {
        let name = if config.color_column.is_some() {
            result
                .cell(row, color_idx)
                .label()
                .unwrap_or_else(|| MISSING_CATEGORY.to_string())
        } else {
            default_group.clone()
        };
        let pos = names.position(name.clone());
        if pos == groups.len() {
            groups.push(BubbleGroup {
                name,
                points: Vec::new(),
            });
        }
        groups[pos].points.push(BubblePoint {
            x: coerce_or_zero(result.cell(row, x_idx)),
            y: coerce_or_zero(result.cell(row, y_idx)),
            size,
            radius: scale_size(size, observed, config.min_bubble_size, config.max_bubble_size),
        });
    }

    BubbleData { groups }
}
