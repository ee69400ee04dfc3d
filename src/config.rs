// Chart configuration as supplied by the dashboard, one variant per chart type.
//
// Every field is optional here; `resolve::resolve_config` fills in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartConfig {
    Line(SeriesOptions),
    Bar(SeriesOptions),
    Area(SeriesOptions),
    Scatter(SeriesOptions),
    Counter(CounterOptions),
    BoxPlot(BoxPlotOptions),
    Treemap(HierarchyOptions),
    Sunburst(HierarchyOptions),
    Heatmap(HeatmapOptions),
    Bubble(BubbleOptions),
}

impl ChartConfig {
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Invalid chart configuration")
    }
}

/// A y-axis given as a single column name or a list of them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColumnList {
    One(String),
    Many(Vec<String>),
}

impl ColumnList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ColumnList::One(name) => vec![name],
            ColumnList::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackMode {
    #[default]
    None,
    Normal,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollingFunction {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPeriod {
    Yoy,
    Mom,
    Wow,
    Dod,
    Custom,
}

/// How a period comparison picks a historical point after an exact-timestamp miss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// First point within tolerance, in row order
    #[default]
    First,
    /// Closest point within tolerance
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeriesOptions {
    pub x_column: Option<String>,
    pub y_columns: Option<ColumnList>,
    pub stacking: Option<StackMode>,
    pub time_series: Option<TimeSeriesOptions>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeSeriesOptions {
    pub granularity: Option<Granularity>,
    pub aggregation: Option<Aggregation>,
    pub cumulative: Option<bool>,
    pub rolling: Option<RollingOptions>,
    pub comparison: Option<ComparisonOptions>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingOptions {
    pub window: usize,
    #[serde(default)]
    pub function: Option<RollingFunction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOptions {
    pub period: ComparisonPeriod,
    /// Offset in days when `period` is `custom`
    #[serde(default)]
    pub custom_periods: Option<u32>,
    #[serde(default)]
    pub match_strategy: Option<MatchStrategy>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CounterOptions {
    pub value_column: Option<String>,
    pub date_column: Option<String>,
    pub comparison: Option<ComparisonOptions>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxPlotOptions {
    pub value_column: Option<String>,
    pub category_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HierarchyOptions {
    pub hierarchy_columns: Option<Vec<String>>,
    pub value_column: Option<String>,
    /// Label column for the flat fallback
    pub label_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatmapOptions {
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub value_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleOptions {
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub size_column: Option<String>,
    pub color_column: Option<String>,
    pub min_bubble_size: Option<f64>,
    pub max_bubble_size: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_config() {
        let config = ChartConfig::from_json_str(
            r#"{
                "type": "line",
                "xColumn": "day",
                "yColumns": "sales",
                "timeSeries": {
                    "granularity": "week",
                    "rolling": {"window": 3}
                }
            }"#,
        )
        .unwrap();

        let ChartConfig::Line(opts) = config else {
            panic!("expected a line config");
        };
        assert_eq!(opts.x_column.as_deref(), Some("day"));
        assert_eq!(opts.y_columns, Some(ColumnList::One("sales".to_string())));
        let ts = opts.time_series.unwrap();
        assert_eq!(ts.granularity, Some(Granularity::Week));
        assert_eq!(ts.rolling.unwrap().window, 3);
    }

    #[test]
    fn test_parse_multiple_y_columns() {
        let config =
            ChartConfig::from_json_str(r#"{"type": "bar", "yColumns": ["a", "b"], "stacking": "percent"}"#)
                .unwrap();
        let ChartConfig::Bar(opts) = config else {
            panic!("expected a bar config");
        };
        assert_eq!(opts.y_columns.unwrap().into_vec(), vec!["a", "b"]);
        assert_eq!(opts.stacking, Some(StackMode::Percent));
    }

    #[test]
    fn test_parse_box_plot_tag() {
        let config = ChartConfig::from_json_str(r#"{"type": "box_plot", "valueColumn": "v"}"#).unwrap();
        assert!(matches!(config, ChartConfig::BoxPlot(_)));
    }

    #[test]
    fn test_unknown_chart_type() {
        assert!(ChartConfig::from_json_str(r#"{"type": "radar"}"#).is_err());
    }
}
