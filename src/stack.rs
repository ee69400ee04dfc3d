use crate::config::StackMode;
use crate::ir::Series;

/// Apply stacking to positionally aligned series.
///
/// `none` and `normal` leave values untouched (normal stacking happens at
/// render time). `percent` rescales each position so the series sum to 100.
pub fn apply_stacking(series: Vec<Series>, mode: StackMode) -> Vec<Series> {
    match mode {
        StackMode::None | StackMode::Normal => series,
        StackMode::Percent => percent_stack(&series),
    }
}

/// Normalise each x-position to percentages of the positional total.
/// Positions whose total is 0 become 0 for every series. Series are assumed
/// to share x-positions; a short series contributes 0 where it has no value.
pub fn percent_stack(series: &[Series]) -> Vec<Series> {
    let len = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let value_at = |s: &Series, i: usize| s.values.get(i).copied().flatten().unwrap_or(0.0);

    let totals: Vec<f64> = (0..len)
        .map(|i| series.iter().map(|s| value_at(s, i)).sum())
        .collect();

    series
        .iter()
        .map(|s| Series {
            name: s.name.clone(),
            values: totals
                .iter()
                .enumerate()
                .map(|(i, &total)| {
                    if total == 0.0 {
                        Some(0.0)
                    } else {
                        Some(value_at(s, i) / total * 100.0)
                    }
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(name: &str, values: &[Option<f64>]) -> Series {
        Series {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_percent_stack() {
        let input = vec![
            series("a", &[Some(1.0), Some(0.0), Some(3.0)]),
            series("b", &[Some(3.0), Some(0.0), None]),
        ];
        let out = percent_stack(&input);
        assert_relative_eq!(out[0].values[0].unwrap(), 25.0);
        assert_relative_eq!(out[1].values[0].unwrap(), 75.0);
        assert_eq!(out[0].values[1], Some(0.0));
        assert_eq!(out[1].values[1], Some(0.0));
        assert_relative_eq!(out[0].values[2].unwrap(), 100.0);
        assert_eq!(out[1].values[2], Some(0.0));
    }

    #[test]
    fn test_normal_and_none_passthrough() {
        let input = vec![series("a", &[Some(1.0), None])];
        assert_eq!(apply_stacking(input.clone(), StackMode::None), input);
        assert_eq!(apply_stacking(input.clone(), StackMode::Normal), input);
    }

    #[test]
    fn test_percent_stack_no_series() {
        assert!(apply_stacking(Vec::new(), StackMode::Percent).is_empty());
    }
}
