use std::collections::HashMap;

use polars::prelude::*;

use crate::columns::{numeric_values, string_series, text_values};
use crate::error::Result;

use super::TransformStep;

/// Replaces nulls in each column with that column's most frequent value. Ties
/// go to the lexicographically smallest value.
pub fn fill_with_mode(
    df: &DataFrame,
    columns: &[&'static str],
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let mut output = df.clone();

    for &column in columns {
        let values = text_values(df, column)?;
        let fill = mode(&values);
        let missing = values.iter().filter(|v| v.is_none()).count();

        let filled_values: Vec<Option<String>> = match &fill {
            Some(fill) => values
                .into_iter()
                .map(|v| v.or_else(|| Some(fill.clone())))
                .collect(),
            None => values,
        };
        output.with_column(string_series(column, &filled_values))?;

        steps.push(TransformStep::ModeImputed {
            column,
            filled: if fill.is_some() { missing } else { 0 },
            fill,
        });
    }

    Ok(output)
}

/// Replaces nulls with `fill`. The columns become Float64.
pub fn fill_with_constant(
    df: &DataFrame,
    columns: &[&'static str],
    fill: f64,
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let mut output = df.clone();

    for &column in columns {
        let values = numeric_values(df, column)?;
        let filled = values.iter().filter(|v| v.is_none()).count();
        let values: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(fill)).collect();
        output.with_column(Series::new(column.into(), values))?;

        steps.push(TransformStep::ConstantImputed {
            column,
            fill,
            filled,
        });
    }

    Ok(output)
}

fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
        .map(|(value, _)| value.to_string())
}
