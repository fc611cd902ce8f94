use std::collections::HashSet;

use comfy_table::presets::ASCII_FULL;
use comfy_table::Table;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::columns::{parse_number, require_columns, text_values, POLICY_ID};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Read-only diagnostics over the joined table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub row_count: usize,
    /// Rows whose `policy_id` already appeared earlier in the table.
    pub duplicate_policy_ids: usize,
    /// Rows identical to an earlier row across every column.
    pub duplicate_rows: usize,
    pub missing_values: Vec<MissingCount>,
    pub numeric_summaries: Vec<NumericSummary>,
}

pub fn quality_report(df: &DataFrame) -> Result<QualityReport> {
    require_columns(df, &[POLICY_ID])?;

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns = names
        .iter()
        .map(|name| text_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let policy_idx = names
        .iter()
        .position(|name| name == POLICY_ID)
        .unwrap_or_default();
    let duplicate_policy_ids = count_repeats(columns[policy_idx].iter());

    let rows = (0..df.height()).map(|row| {
        columns
            .iter()
            .map(|values| values[row].as_deref())
            .collect::<Vec<Option<&str>>>()
    });
    let duplicate_rows = count_repeats(rows);

    let missing_values = df
        .get_columns()
        .iter()
        .map(|column| MissingCount {
            column: column.name().to_string(),
            missing: column.null_count(),
        })
        .collect();

    let mut numeric_summaries = Vec::new();
    for (name, column) in names.iter().zip(df.get_columns()) {
        if let Some(values) = numeric_cells(column)? {
            numeric_summaries.push(summarize(name, values));
        }
    }

    Ok(QualityReport {
        row_count: df.height(),
        duplicate_policy_ids,
        duplicate_rows,
        missing_values,
        numeric_summaries,
    })
}

impl QualityReport {
    pub fn log(&self) {
        info!(
            "There are {} duplicated values in {} column.",
            self.duplicate_policy_ids, POLICY_ID
        );
        info!("There are {} duplicated rows.", self.duplicate_rows);
        info!("Missing values summary:\n{}", self.missing_values_table());
        info!("Data set description:\n{}", self.description_table());
    }

    pub fn missing_values_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(ASCII_FULL).set_header(vec!["column", "missing"]);
        for entry in &self.missing_values {
            table.add_row(vec![entry.column.clone(), entry.missing.to_string()]);
        }
        table
    }

    pub fn description_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(ASCII_FULL).set_header(vec![
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
        ]);
        for summary in &self.numeric_summaries {
            table.add_row(vec![
                summary.column.clone(),
                summary.count.to_string(),
                format_stat(summary.mean),
                format_stat(summary.std),
                format_stat(summary.min),
                format_stat(summary.q25),
                format_stat(summary.median),
                format_stat(summary.q75),
                format_stat(summary.max),
            ]);
        }
        table
    }
}

fn format_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{v:.6}"))
}

fn count_repeats<T, I>(values: I) -> usize
where
    T: std::hash::Hash + Eq,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    let mut repeats = 0;
    for value in values {
        if !seen.insert(value) {
            repeats += 1;
        }
    }
    repeats
}

/// Non-null values of a numeric column. String columns count as numeric when
/// every non-null cell parses and at least one is present.
fn numeric_cells(column: &Column) -> Result<Option<Vec<f64>>> {
    let series = column.as_materialized_series();
    let dtype = series.dtype();

    if dtype.is_float() || dtype.is_integer() {
        let cast = series.cast(&DataType::Float64)?;
        let values: Vec<f64> = cast.f64()?.into_iter().flatten().collect();
        return Ok(Some(values));
    }

    if dtype != &DataType::String {
        return Ok(None);
    }

    let mut values = Vec::new();
    for cell in series.str()?.into_iter().flatten() {
        match parse_number(cell) {
            Some(value) => values.push(value),
            None => return Ok(None),
        }
    }
    Ok((!values.is_empty()).then_some(values))
}

fn summarize(column: &str, mut values: Vec<f64>) -> NumericSummary {
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std = mean.filter(|_| count > 1).map(|mean| {
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (count - 1) as f64).sqrt()
    });

    NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values.first().copied(),
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

/// Linear-interpolated quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
