use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;
use tracing::warn;

use crate::columns::{has_column, require_columns, POLICY_ID};
use crate::combine::{load_csv, CsvOptions};
use crate::error::{PipelineError, Result};

const ROW_ORDER: &str = "__policyprep_row_order";

/// Loads the reference table at `reference_path` and left-joins it onto
/// `combined` by `policy_id`.
pub fn join_reference(
    combined: &DataFrame,
    reference_path: &Path,
    options: &CsvOptions,
) -> Result<DataFrame> {
    let reference = load_csv(reference_path, options)?;
    if !has_column(&reference, POLICY_ID) {
        return Err(PipelineError::JoinKey {
            origin: reference_path.display().to_string(),
            key: POLICY_ID,
        });
    }
    join_reference_frame(combined, &reference)
}

/// Left outer join on `policy_id`. Every row of `combined` is kept in its
/// original order; unmatched rows get nulls for the reference columns, and a
/// key repeated in `reference` yields one output row per match.
pub fn join_reference_frame(combined: &DataFrame, reference: &DataFrame) -> Result<DataFrame> {
    require_columns(combined, &[POLICY_ID])?;
    if !has_column(reference, POLICY_ID) {
        return Err(PipelineError::JoinKey {
            origin: "reference table".to_string(),
            key: POLICY_ID,
        });
    }

    let repeated = repeated_keys(reference)?;
    if repeated > 0 {
        warn!(
            repeated_keys = repeated,
            "reference table repeats policy ids; matching rows will fan out"
        );
    }

    let left = with_string_key(combined)?;
    let right = with_string_key(reference)?;

    let joined = left
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(
            right.lazy(),
            [col(POLICY_ID)],
            [col(POLICY_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [ROW_ORDER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    Ok(joined.drop(ROW_ORDER)?)
}

fn with_string_key(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    let key = df.column(POLICY_ID)?.as_materialized_series();
    if key.dtype() != &DataType::String {
        out.with_column(key.cast(&DataType::String)?)?;
    }
    Ok(out)
}

fn repeated_keys(reference: &DataFrame) -> Result<usize> {
    let key = reference
        .column(POLICY_ID)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let mut seen = HashSet::new();
    let mut repeated = HashSet::new();
    for value in key.str()?.into_iter().flatten() {
        if !seen.insert(value) {
            repeated.insert(value);
        }
    }
    Ok(repeated.len())
}
