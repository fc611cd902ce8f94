use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::columns::{numeric_values, string_series, text_values, MARITAL_STATUS, POSTAL_CODE};
use crate::error::{PipelineError, Result};

use super::TransformStep;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("postal code pattern is valid"));

/// Maps marital status codes `1` and `2` to `Single` and `Married`. Any other
/// code is rejected.
pub fn label_marital_status(df: &DataFrame, steps: &mut Vec<TransformStep>) -> Result<DataFrame> {
    let codes = numeric_values(df, MARITAL_STATUS)?;

    let mut labels = Vec::with_capacity(codes.len());
    for (row, code) in codes.into_iter().enumerate() {
        let label = match code {
            Some(code) if code == 1.0 => "Single",
            Some(code) if code == 2.0 => "Married",
            Some(code) => {
                return Err(PipelineError::InvalidValue {
                    column: MARITAL_STATUS,
                    row,
                    value: code.to_string(),
                    expected: "marital status code 1 or 2",
                })
            }
            None => {
                return Err(PipelineError::MissingValue {
                    column: MARITAL_STATUS,
                    row,
                })
            }
        };
        labels.push(label);
    }

    let changed = labels.len();
    let mut output = df.clone();
    output.with_column(Series::new(MARITAL_STATUS.into(), labels))?;
    steps.push(TransformStep::ValuesReplaced {
        column: MARITAL_STATUS,
        changed,
    });
    Ok(output)
}

/// Removes whitespace, punctuation and every other non-alphanumeric character
/// from postal codes.
pub fn strip_postal_codes(df: &DataFrame, steps: &mut Vec<TransformStep>) -> Result<DataFrame> {
    let values = text_values(df, POSTAL_CODE)?;

    let mut changed = 0;
    let cleaned: Vec<Option<String>> = values
        .into_iter()
        .map(|value| {
            value.map(|code| {
                let stripped = strip_postal_code(&code);
                if stripped != code {
                    changed += 1;
                }
                stripped
            })
        })
        .collect();

    let mut output = df.clone();
    output.with_column(string_series(POSTAL_CODE, &cleaned))?;
    steps.push(TransformStep::ValuesReplaced {
        column: POSTAL_CODE,
        changed,
    });
    Ok(output)
}

pub fn strip_postal_code(code: &str) -> String {
    NON_ALPHANUMERIC.replace_all(code, "").into_owned()
}
