//! Column names of the policy record table and typed accessors over them.

use polars::prelude::*;

use crate::error::{PipelineError, Result};

pub const POLICY_ID: &str = "policy_id";
pub const FILE_NAME: &str = "file_Name";
pub const CAR_BRAND: &str = "car_brand";
pub const POSTAL_CODE: &str = "postal_code";
pub const CAR_ENG_POW: &str = "car_eng_pow";
pub const CUSTOMER_AGE: &str = "customer_age";
pub const CLAIM_AMOUNT: &str = "claim_amount";
pub const MARITAL_STATUS: &str = "marital_status";
pub const CAR_REGISTRATION_YEAR: &str = "car_registration_year";
pub const POLICY_START: &str = "policy_start";
pub const POLICY_END: &str = "policy_end";

pub const CAR_AGE: &str = "car_age";
pub const CAR_AGE_GROUP: &str = "car_age_group";
pub const CAR_ENG_POW_GROUP: &str = "car_eng_pow_group";
pub const CUSTOMER_AGE_GROUP: &str = "customer_age_group";
pub const EXPOSURE: &str = "exposure";

/// Columns the transformer reads. All must be present before it starts.
pub const TRANSFORM_INPUTS: [&str; 9] = [
    CAR_BRAND,
    POSTAL_CODE,
    CAR_ENG_POW,
    CUSTOMER_AGE,
    CLAIM_AMOUNT,
    MARITAL_STATUS,
    CAR_REGISTRATION_YEAR,
    POLICY_START,
    POLICY_END,
];

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn require_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    for name in names {
        if !has_column(df, name) {
            return Err(PipelineError::Schema {
                column: (*name).to_string(),
            });
        }
    }
    Ok(())
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let column = df.column(name).map_err(|_| PipelineError::Schema {
        column: name.to_string(),
    })?;
    Ok(column.as_materialized_series())
}

/// Values of `name` as text; non-string columns are cast.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = series(df, name)?;
    let series = match series.dtype() {
        DataType::String => series.clone(),
        _ => series.cast(&DataType::String)?,
    };
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

/// Values of `name` as floats. String cells are trimmed and parsed; a cell that
/// does not parse is an error naming the row.
pub fn numeric_values(df: &DataFrame, name: &'static str) -> Result<Vec<Option<f64>>> {
    let series = series(df, name)?;
    if series.dtype() == &DataType::String {
        let mut values = Vec::with_capacity(series.len());
        for (row, cell) in series.str()?.into_iter().enumerate() {
            values.push(match cell {
                Some(text) => Some(parse_number(text).ok_or_else(|| {
                    PipelineError::InvalidValue {
                        column: name,
                        row,
                        value: text.to_string(),
                        expected: "a number",
                    }
                })?),
                None => None,
            });
        }
        return Ok(values);
    }

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn string_series(name: &str, values: &[Option<String>]) -> Series {
    Series::new(
        name.into(),
        values
            .iter()
            .map(|opt| opt.as_deref())
            .collect::<Vec<Option<&str>>>(),
    )
}
