use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::columns::{text_values, POLICY_END, POLICY_START};
use crate::error::{PipelineError, Result};

use super::TransformStep;

/// Days between 0001-01-01 and 1970-01-01, the offset polars dates count from.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parses `text` with the first of `formats` that matches it. Formats that carry
/// a time component are accepted and the time is dropped.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let trimmed = text.trim();
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(trimmed, format)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(trimmed, format)
                    .ok()
                    .map(|dt| dt.date())
            })
    })
}

pub fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Converts `policy_start` and `policy_end` to Date columns. A missing or
/// unmatched value fails the whole step.
pub fn parse_policy_dates(
    df: &DataFrame,
    formats: &[String],
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let mut output = df.clone();

    for column in [POLICY_START, POLICY_END] {
        if df.column(column)?.dtype() == &DataType::Date {
            steps.push(TransformStep::DatesParsed {
                column,
                rows: df.height(),
            });
            continue;
        }

        let values = text_values(df, column)?;
        let mut days = Vec::with_capacity(values.len());
        for (row, value) in values.into_iter().enumerate() {
            let text = value.ok_or(PipelineError::MissingValue { column, row })?;
            let date = parse_date(&text, formats).ok_or_else(|| PipelineError::InvalidValue {
                column,
                row,
                value: text.clone(),
                expected: "a date in one of the configured formats",
            })?;
            days.push(to_epoch_days(date));
        }

        let rows = days.len();
        let series = Series::new(column.into(), days).cast(&DataType::Date)?;
        output.with_column(series)?;
        steps.push(TransformStep::DatesParsed { column, rows });
    }

    Ok(output)
}

/// Days since 1970-01-01 for a Date column.
pub fn epoch_days(df: &DataFrame, column: &'static str) -> Result<Vec<Option<i32>>> {
    let series = df.column(column)?.as_materialized_series();
    if series.dtype() != &DataType::Date {
        return Err(PipelineError::ColumnType {
            column,
            found: series.dtype().to_string(),
            expected: "date",
        });
    }
    let days = series.cast(&DataType::Int32)?;
    Ok(days.i32()?.into_iter().collect())
}
