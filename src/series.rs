use crate::data::QueryResult;
use crate::ir::{ResolvedAxis, Series};

/// Project every row onto one series per resolved y column.
///
/// No aggregation happens here: each series has exactly one value per row.
/// A y column that could not be resolved yields an all-null series.
pub fn extract_series(result: &QueryResult, axis: &ResolvedAxis) -> Vec<Series> {
    axis.y_indices
        .iter()
        .zip(&axis.y_names)
        .map(|(&idx, name)| Series {
            name: name.clone(),
            values: (0..result.rows.len())
                .map(|row| result.cell(row, idx).as_number())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scalar;
    use crate::resolve::resolve_axis;

    #[test]
    fn test_extract_aligned_series() {
        let result = QueryResult::new(
            vec!["x".into(), "a".into(), "b".into()],
            vec![
                vec!["p".into(), 1.0.into(), "7".into()],
                vec!["q".into(), Scalar::Null, "oops".into()],
            ],
        );
        let axis = resolve_axis(&result, None, &["a".to_string(), "b".to_string()]);
        let series = extract_series(&result, &axis);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "a");
        assert_eq!(series[0].values, vec![Some(1.0), None]);
        assert_eq!(series[1].values, vec![Some(7.0), None]);
    }

    #[test]
    fn test_missing_column_is_all_null() {
        let result = QueryResult::new(
            vec!["x".into(), "a".into()],
            vec![vec!["p".into(), 1.0.into()]],
        );
        let axis = resolve_axis(&result, None, &["ghost".to_string()]);
        let series = extract_series(&result, &axis);
        assert_eq!(series[0].name, "ghost");
        assert_eq!(series[0].values, vec![None]);
    }
}
