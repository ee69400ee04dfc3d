use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

/// A single cell of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Native date value, milliseconds since the Unix epoch (UTC)
    Timestamp(i64),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Strict numeric view: `None` for nulls and for text that isn't a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Timestamp(ms) => Some(*ms as f64),
        }
    }

    /// Lenient numeric coercion. Blank text and nulls become 0; text that isn't
    /// numeric yields NaN, which callers fold to 0 via [`coerce_or_zero`].
    pub fn to_number(&self) -> f64 {
        match self {
            Scalar::Null => 0.0,
            Scalar::Text(s) if s.trim().is_empty() => 0.0,
            other => other.as_number().unwrap_or(f64::NAN),
        }
    }

    /// Category label for grouping and hierarchy keys. Nulls have no label.
    pub fn label(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Number(n) => Some(format_number(*n)),
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Timestamp(ms) => Some(ms.to_string()),
        }
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => Scalar::Text(s.clone()),
            // Nested values are flattened to their JSON text
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

static NULL_CELL: Scalar = Scalar::Null;

/// Numeric coercion used by aggregations: anything non-numeric counts as 0.
pub fn coerce_or_zero(value: &Scalar) -> f64 {
    let n = value.to_number();
    if n.is_finite() { n } else { 0.0 }
}

/// Render integral floats without a trailing `.0` so that `3` and `"3"` label alike.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("row {row} has {found} cells but the result has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Tabular query output: ordered columns plus rows aligned positionally to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self { columns, rows }
    }

    /// Exact-name column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell accessor that treats missing columns or short rows as null.
    pub fn cell(&self, row: usize, col: Option<usize>) -> &Scalar {
        col.and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .unwrap_or(&NULL_CELL)
    }

    /// Check that every row has exactly one cell per column.
    pub fn validate(&self) -> Result<(), DataError> {
        let expected = self.columns.len();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(DataError::RaggedRow {
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }
        Ok(())
    }

    /// Create a QueryResult from JSON. Accepts either the
    /// `{"columns": [...], "rows": [[...], ...]}` shape or an array of objects.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(obj) => {
                let columns = obj
                    .get("columns")
                    .and_then(Value::as_array)
                    .ok_or_else(|| anyhow!("Query result object must have a 'columns' array"))?
                    .iter()
                    .map(column_name)
                    .collect::<Result<Vec<_>>>()?;

                let rows = obj
                    .get("rows")
                    .and_then(Value::as_array)
                    .ok_or_else(|| anyhow!("Query result object must have a 'rows' array"))?
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let cells = row
                            .as_array()
                            .ok_or_else(|| anyhow!("Row {} is not an array", i))?;
                        Ok(cells.iter().map(Scalar::from).collect())
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(Self { columns, rows })
            }
            Value::Array(array) => {
                let Some(first) = array.first() else {
                    return Ok(Self::default());
                };
                let first_obj = first
                    .as_object()
                    .ok_or_else(|| anyhow!("Items in array must be objects"))?;
                let columns: Vec<String> = first_obj.keys().cloned().collect();

                let mut rows = Vec::with_capacity(array.len());
                for item in array {
                    let obj = item
                        .as_object()
                        .ok_or_else(|| anyhow!("Items in array must be objects"))?;
                    rows.push(
                        columns
                            .iter()
                            .map(|c| obj.get(c).map(Scalar::from).unwrap_or(Scalar::Null))
                            .collect(),
                    );
                }
                Ok(Self { columns, rows })
            }
            _ => Err(anyhow!(
                "Query result must be an object with columns/rows or an array of objects"
            )),
        }
    }

    /// Read a CSV document with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = rdr
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", i + 1))?;
            rows.push(record.iter().map(csv_cell).collect());
        }

        Ok(Self { columns, rows })
    }
}

fn column_name(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        // Some APIs describe columns as {"name": ..., "type": ...}
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Column object is missing a 'name'")),
        other => Err(anyhow!("Unsupported column descriptor: {}", other)),
    }
}

fn csv_cell(raw: &str) -> Scalar {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Scalar::Null
    } else if let Ok(n) = trimmed.parse::<f64>() {
        Scalar::Number(n)
    } else {
        Scalar::Text(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_columns_rows() {
        let value = json!({
            "columns": ["day", {"name": "sales", "type": "integer"}],
            "rows": [["2024-01-01", 10], ["2024-01-02", null]]
        });
        let result = QueryResult::from_json(&value).unwrap();
        assert_eq!(result.columns, vec!["day", "sales"]);
        assert_eq!(result.rows[0][1], Scalar::Number(10.0));
        assert_eq!(result.rows[1][1], Scalar::Null);
    }

    #[test]
    fn test_from_json_array_of_objects() {
        let value = json!([
            {"region": "north", "total": 4},
            {"region": "south"}
        ]);
        let result = QueryResult::from_json(&value).unwrap();
        assert_eq!(result.columns.len(), 2);
        let total = result.column_index("total").unwrap();
        assert_eq!(result.rows[1][total], Scalar::Null);
    }

    #[test]
    fn test_from_json_objects_keep_key_order() {
        let input = r#"[{"sales": 1, "date": "2024-01-01", "channel": "web"}]"#;
        let value: Value = serde_json::from_str(input).unwrap();
        let result = QueryResult::from_json(&value).unwrap();
        assert_eq!(result.columns, vec!["sales", "date", "channel"]);
        assert_eq!(result.rows[0][0], Scalar::Number(1.0));
    }

    #[test]
    fn test_from_json_rejects_scalars() {
        assert!(QueryResult::from_json(&json!(42)).is_err());
        assert!(QueryResult::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_from_csv() {
        let csv = "name,score\nada,3.5\nbob,\ncy,n/a\n";
        let result = QueryResult::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(result.columns, vec!["name", "score"]);
        assert_eq!(result.rows[0][1], Scalar::Number(3.5));
        assert_eq!(result.rows[1][1], Scalar::Null);
        assert_eq!(result.rows[2][1], Scalar::Text("n/a".to_string()));
    }

    #[test]
    fn test_validate_ragged_rows() {
        let result = QueryResult::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0.into(), 2.0.into()], vec![1.0.into()]],
        );
        assert_eq!(
            result.validate(),
            Err(DataError::RaggedRow { row: 1, expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Scalar::from("12").as_number(), Some(12.0));
        assert_eq!(Scalar::from("abc").as_number(), None);
        assert_eq!(coerce_or_zero(&Scalar::from("abc")), 0.0);
        assert_eq!(coerce_or_zero(&Scalar::Null), 0.0);
        assert_eq!(coerce_or_zero(&Scalar::Bool(true)), 1.0);
        assert_eq!(Scalar::Null.as_number(), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Scalar::Number(3.0).label().as_deref(), Some("3"));
        assert_eq!(Scalar::Number(2.5).label().as_deref(), Some("2.5"));
        assert_eq!(Scalar::Null.label(), None);
    }

    #[test]
    fn test_cell_out_of_range_is_null() {
        let result = QueryResult::new(vec!["a".into()], vec![vec![1.0.into()]]);
        assert_eq!(result.cell(0, None), &Scalar::Null);
        assert_eq!(result.cell(5, Some(0)), &Scalar::Null);
        assert_eq!(result.cell(0, Some(0)), &Scalar::Number(1.0));
    }
}
