// crates/policyprep-core/src/transform/mod.rs

pub mod binning;
pub mod dates;
pub mod derive;
pub mod impute;
pub mod substitute;

use std::fmt;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::columns::{
    require_columns, CAR_BRAND, CAR_ENG_POW, CLAIM_AMOUNT, CUSTOMER_AGE, MARITAL_STATUS,
    POSTAL_CODE, TRANSFORM_INPUTS,
};
use crate::config::{AgeGroupBackfill, PipelineConfig};
use crate::error::Result;

use self::binning::Bins;

#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Reference date for `car_age`.
    pub today: NaiveDate,
    pub date_formats: Vec<String>,
    pub customer_age_backfill: AgeGroupBackfill,
}

impl TransformOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            date_formats: vec!["%Y-%m-%d".to_string()],
            customer_age_backfill: AgeGroupBackfill::LowestObserved,
        }
    }

    pub fn from_config(config: &PipelineConfig, today: NaiveDate) -> Self {
        Self {
            today,
            date_formats: config.date_formats.clone(),
            customer_age_backfill: config.customer_age_backfill.clone(),
        }
    }
}

/// Record of one transformation step, collected in order for the caller to log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TransformStep {
    ModeImputed {
        column: &'static str,
        fill: Option<String>,
        filled: usize,
    },
    ConstantImputed {
        column: &'static str,
        fill: f64,
        filled: usize,
    },
    ValuesReplaced {
        column: &'static str,
        changed: usize,
    },
    CarAgeDerived {
        min: Option<f64>,
        max: Option<f64>,
    },
    Grouped {
        column: String,
        labels: Vec<String>,
        unbinned: usize,
    },
    GroupBackfilled {
        column: &'static str,
        label: String,
        filled: usize,
    },
    DatesParsed {
        column: &'static str,
        rows: usize,
    },
    ExposureDerived {
        capped: usize,
        floored: usize,
        zeroed_by_claim: usize,
    },
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStep::ModeImputed {
                column,
                fill: Some(fill),
                filled,
            } => write!(f, "{filled} missing values in {column} filled with the column mode '{fill}'"),
            TransformStep::ModeImputed {
                column,
                fill: None,
                filled: _,
            } => write!(f, "{column} has no values; mode imputation skipped"),
            TransformStep::ConstantImputed {
                column,
                fill,
                filled,
            } => write!(f, "{filled} missing values in {column} filled with {fill}"),
            TransformStep::ValuesReplaced { column, changed } => {
                write!(f, "{changed} values in {column} replaced")
            }
            TransformStep::CarAgeDerived { min, max } => {
                write!(f, "car_age derived (min {min:?}, max {max:?})")
            }
            TransformStep::Grouped {
                column,
                labels,
                unbinned,
            } => write!(
                f,
                "New column {column} was created with bins {labels:?}; {unbinned} values fell outside every bin"
            ),
            TransformStep::GroupBackfilled {
                column,
                label,
                filled,
            } => write!(f, "{filled} missing values in {column} back-filled with '{label}'"),
            TransformStep::DatesParsed { column, rows } => {
                write!(f, "{rows} values in {column} parsed as dates")
            }
            TransformStep::ExposureDerived {
                capped,
                floored,
                zeroed_by_claim,
            } => write!(
                f,
                "exposure derived: {capped} capped at 1, {floored} raised to 0, {zeroed_by_claim} zeroed for rows without claims"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub dataframe: DataFrame,
    pub steps: Vec<TransformStep>,
}

/// Applies the full cleaning sequence. Every input column is checked up front;
/// any failure aborts the whole transform and `df` is left untouched.
pub fn transform(df: &DataFrame, options: &TransformOptions) -> Result<TransformOutput> {
    require_columns(df, &TRANSFORM_INPUTS)?;
    let mut steps = Vec::new();

    let df = impute::fill_with_mode(df, &[CAR_BRAND, POSTAL_CODE], &mut steps)?;
    let df = impute::fill_with_constant(&df, &[CAR_ENG_POW, CUSTOMER_AGE], -1.0, &mut steps)?;
    let df = impute::fill_with_constant(&df, &[CLAIM_AMOUNT], 0.0, &mut steps)?;
    let df = impute::fill_with_constant(&df, &[MARITAL_STATUS], 1.0, &mut steps)?;

    let df = substitute::label_marital_status(&df, &mut steps)?;
    let df = substitute::strip_postal_codes(&df, &mut steps)?;

    let df = derive::add_car_age(&df, options.today, &mut steps)?;

    let df = binning::group_car_age(&df, &mut steps)?;
    let df = binning::group_column(&df, CAR_ENG_POW, &Bins::engine_power(), &mut steps)?;
    let df = binning::group_customer_age(&df, &options.customer_age_backfill, &mut steps)?;

    let df = dates::parse_policy_dates(&df, &options.date_formats, &mut steps)?;
    let df = derive::add_exposure(&df, &mut steps)?;

    Ok(TransformOutput {
        dataframe: df,
        steps,
    })
}
