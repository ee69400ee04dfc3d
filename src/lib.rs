// Library exports for querychart

pub mod config;
pub mod data;
pub mod parser;

// Pipeline stages
pub mod ir;
pub mod resolve;
pub mod series;
pub mod bucket;
pub mod timeseries;
pub mod stack;
pub mod stats;
pub mod hierarchy;
pub mod grid;
pub mod transform;

pub use config::ChartConfig;
pub use data::{DataError, QueryResult, Scalar};
pub use ir::ChartData;
pub use transform::apply_transformations;

use serde::Deserialize;

/// Encoding of the query result fed to the CLI
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    #[serde(rename = "json")]
    #[default]
    Json,
    #[serde(rename = "csv")]
    Csv,
}

impl InputFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }
}

/// Load a query result from raw bytes in the given format
pub fn load_query_result(bytes: &[u8], format: InputFormat) -> anyhow::Result<QueryResult> {
    match format {
        InputFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!("Invalid JSON input: {}", e))?;
            QueryResult::from_json(&value)
        }
        InputFormat::Csv => QueryResult::from_csv_reader(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("data.CSV")), InputFormat::Csv);
        assert_eq!(InputFormat::from_path(Path::new("data.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("data")), InputFormat::Json);
    }

    #[test]
    fn test_load_query_result() {
        let csv = load_query_result(b"a,b\n1,2\n", InputFormat::Csv).unwrap();
        assert_eq!(csv.rows.len(), 1);

        let json = load_query_result(br#"{"columns": ["a"], "rows": [[1]]}"#, InputFormat::Json).unwrap();
        assert_eq!(json.rows[0][0], Scalar::Number(1.0));

        assert!(load_query_result(b"{", InputFormat::Json).is_err());
    }
}
