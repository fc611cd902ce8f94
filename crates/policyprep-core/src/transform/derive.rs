use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::columns::{
    numeric_values, CAR_AGE, CAR_REGISTRATION_YEAR, CLAIM_AMOUNT, EXPOSURE, POLICY_END,
    POLICY_START,
};
use crate::error::{PipelineError, Result};

use super::dates::epoch_days;
use super::TransformStep;

/// Mean Gregorian year length in days.
pub const DAYS_PER_YEAR: f64 = 365.2425;

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Years from January 1 of `registration_year` to `today`, to one decimal.
pub fn car_age_years(registration_year: i32, today: NaiveDate) -> Option<f64> {
    let registered = NaiveDate::from_ymd_opt(registration_year, 1, 1)?;
    let days = today.signed_duration_since(registered).num_days();
    Some(round_to_tenth(days as f64 / DAYS_PER_YEAR))
}

/// Adds `car_age` from `car_registration_year`. Years must be whole numbers no
/// later than `today`'s year.
pub fn add_car_age(
    df: &DataFrame,
    today: NaiveDate,
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let years = numeric_values(df, CAR_REGISTRATION_YEAR)?;

    let mut ages = Vec::with_capacity(years.len());
    for (row, year) in years.into_iter().enumerate() {
        let year = year.ok_or(PipelineError::MissingValue {
            column: CAR_REGISTRATION_YEAR,
            row,
        })?;
        let invalid = || PipelineError::InvalidValue {
            column: CAR_REGISTRATION_YEAR,
            row,
            value: year.to_string(),
            expected: "a whole registration year not after today",
        };
        if year.fract() != 0.0 || year < 1.0 || year > f64::from(today.year()) {
            return Err(invalid());
        }
        ages.push(car_age_years(year as i32, today).ok_or_else(invalid)?);
    }

    let min = ages.iter().copied().reduce(f64::min);
    let max = ages.iter().copied().reduce(f64::max);

    let mut output = df.clone();
    output.with_column(Series::new(CAR_AGE.into(), ages))?;
    steps.push(TransformStep::CarAgeDerived { min, max });
    Ok(output)
}

/// Fraction of a year covered by a policy period, held to `[0, 1]`.
pub fn exposure_years(start_days: i32, end_days: i32) -> f64 {
    let years = f64::from(end_days - start_days) / DAYS_PER_YEAR;
    years.clamp(0.0, 1.0)
}

/// Adds `exposure` from the parsed policy dates. Rows with a zero claim amount
/// get exactly zero regardless of their dates.
pub fn add_exposure(df: &DataFrame, steps: &mut Vec<TransformStep>) -> Result<DataFrame> {
    let starts = epoch_days(df, POLICY_START)?;
    let ends = epoch_days(df, POLICY_END)?;
    let claims = numeric_values(df, CLAIM_AMOUNT)?;

    let mut capped = 0;
    let mut floored = 0;
    let mut zeroed_by_claim = 0;
    let mut exposures = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let start = starts[row].ok_or(PipelineError::MissingValue {
            column: POLICY_START,
            row,
        })?;
        let end = ends[row].ok_or(PipelineError::MissingValue {
            column: POLICY_END,
            row,
        })?;
        let claim = claims[row].ok_or(PipelineError::MissingValue {
            column: CLAIM_AMOUNT,
            row,
        })?;

        if claim == 0.0 {
            zeroed_by_claim += 1;
            exposures.push(0.0);
            continue;
        }

        let raw = f64::from(end - start) / DAYS_PER_YEAR;
        if raw > 1.0 {
            capped += 1;
        } else if raw < 0.0 {
            floored += 1;
        }
        exposures.push(exposure_years(start, end));
    }

    let mut output = df.clone();
    output.with_column(Series::new(EXPOSURE.into(), exposures))?;
    steps.push(TransformStep::ExposureDerived {
        capped,
        floored,
        zeroed_by_claim,
    });
    Ok(output)
}
