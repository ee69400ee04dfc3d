use crate::config::{
    Aggregation, ComparisonPeriod, Granularity, MatchStrategy, RollingFunction, StackMode,
};
use crate::data::Scalar;
use serde::Serialize;

pub const HOUR_MS: i64 = 3_600_000;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Window around `date - offset` within which a historical point still matches
pub const COMPARISON_TOLERANCE_MS: i64 = 12 * HOUR_MS;

// =============================================================================
// Phase 1: Resolution
// =============================================================================

/// Fully-populated configuration. Every default has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConfig {
    Series(ResolvedSeriesConfig),
    Counter(ResolvedCounterConfig),
    BoxPlot(ResolvedBoxPlotConfig),
    Hierarchy(ResolvedHierarchyConfig),
    Heatmap(ResolvedHeatmapConfig),
    Bubble(ResolvedBubbleConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Line,
    Bar,
    Area,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyKind {
    Treemap,
    Sunburst,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSeriesConfig {
    pub kind: SeriesKind,
    /// `None` means the first column
    pub x_column: Option<String>,
    /// Empty means the second column
    pub y_columns: Vec<String>,
    pub stacking: StackMode,
    pub time_series: ResolvedTimeSeries,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedTimeSeries {
    pub bucketing: Option<Bucketing>,
    pub cumulative: bool,
    pub rolling: Option<RollingWindow>,
    pub comparison: Option<ResolvedComparison>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucketing {
    pub granularity: Granularity,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    /// Always at least 1
    pub window: usize,
    pub function: RollingFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedComparison {
    pub period: ComparisonPeriod,
    pub offset_ms: i64,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCounterConfig {
    pub value_column: Option<String>,
    pub date_column: Option<String>,
    pub comparison: Option<ResolvedComparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBoxPlotConfig {
    pub value_column: Option<String>,
    pub category_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHierarchyConfig {
    pub kind: HierarchyKind,
    /// Outermost first. Empty selects the flat label/value fallback.
    pub hierarchy_columns: Vec<String>,
    pub value_column: Option<String>,
    pub label_column: Option<String>,
    /// Category used when a hierarchy cell is null
    pub placeholder: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHeatmapConfig {
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub value_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBubbleConfig {
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub size_column: Option<String>,
    pub color_column: Option<String>,
    pub min_bubble_size: f64,
    pub max_bubble_size: f64,
}

/// Axis columns resolved against a query result. Built once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAxis {
    pub x_index: Option<usize>,
    pub x_name: Option<String>,
    /// One entry per requested y column; `None` if the column is absent
    pub y_indices: Vec<Option<usize>>,
    pub y_names: Vec<String>,
    pub x_values: Vec<Scalar>,
    pub is_time_axis: bool,
}

// =============================================================================
// Phase 2: Transformation output
// =============================================================================

/// A named numeric series aligned positionally to the chart's x-values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Result of pairing a point with the point one period earlier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub previous_value: Option<f64>,
    pub absolute_change: Option<f64>,
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesComparison {
    pub name: String,
    pub points: Vec<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesChartData {
    pub kind: SeriesKind,
    pub x: Vec<Scalar>,
    pub series: Vec<Series>,
    pub is_time_axis: bool,
    pub stacking: StackMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<SeriesComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterData {
    pub value: Option<f64>,
    pub date: Option<Scalar>,
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotGroup {
    pub category: String,
    #[serde(flatten)]
    pub summary: FiveNumberSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotData {
    pub groups: Vec<BoxPlotGroup>,
}

/// Tree node for treemap/sunburst. Only leaves carry a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    #[cfg(test)]
    pub fn child(&self, name: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Aggregate value: the leaf value, or the sum over all descendant leaves.
    pub fn total(&self) -> f64 {
        if self.children.is_empty() {
            self.value.unwrap_or(0.0)
        } else {
            self.children.iter().map(HierarchyNode::total).sum()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyData {
    Tree(HierarchyNode),
    Flat(Vec<Slice>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapData {
    pub x_categories: Vec<String>,
    pub y_categories: Vec<String>,
    pub cells: Vec<HeatmapCell>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BubblePoint {
    pub x: f64,
    pub y: f64,
    /// Raw value of the size column
    pub size: f64,
    /// Size rescaled into the configured pixel range
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleGroup {
    pub name: String,
    pub points: Vec<BubblePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleData {
    pub groups: Vec<BubbleGroup>,
}

/// Chart-ready structure handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Series(SeriesChartData),
    Counter(CounterData),
    BoxPlot(BoxPlotData),
    Hierarchy {
        kind: HierarchyKind,
        data: HierarchyData,
    },
    Heatmap(HeatmapData),
    Bubble(BubbleData),
}
