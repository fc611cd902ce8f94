use chrono::NaiveDate;
use polars::prelude::*;

use policyprep_core::transform::derive::DAYS_PER_YEAR;
use policyprep_core::transform::{transform, TransformOptions, TransformStep};
use policyprep_core::{AgeGroupBackfill, ErrorKind, PipelineError};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Joined table as it leaves the reference joiner: every column is text.
fn joined() -> PolarsResult<DataFrame> {
    df![
        "policy_id" => ["7", "8", "9", "10"],
        "car_brand" => [Some("VW"), None, Some("BMW"), Some("VW")],
        "postal_code" => [Some("1234 AB"), None, Some("12-345"), Some("1234 AB")],
        "car_eng_pow" => [Some("90"), None, Some("300"), Some("150")],
        "customer_age" => [Some("35"), None, Some("19"), Some("45")],
        "claim_amount" => [Some("0"), Some("100"), None, Some("250.5")],
        "marital_status" => [Some("1"), None, Some("2"), Some("2.0")],
        "car_registration_year" => ["2015", "2020", "2024", "2010"],
        "policy_start" => ["2022-01-01", "2021-01-01", "2022-03-01", "2023-01-01"],
        "policy_end" => ["2022-07-01", "2023-01-01", "2022-09-01", "2023-04-01"],
        "file_Name" => ["task_data_1.csv", "task_data_1.csv", "task_data_2.csv", "task_data_2.csv"],
    ]
}

fn strings<'a>(df: &'a DataFrame, name: &str) -> Vec<Option<&'a str>> {
    df.column(name).unwrap().str().unwrap().into_iter().collect()
}

fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn imputes_and_substitutes_values() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();
    let df = &output.dataframe;

    assert_eq!(
        strings(df, "car_brand"),
        vec![Some("VW"), Some("VW"), Some("BMW"), Some("VW")]
    );
    assert_eq!(
        strings(df, "postal_code"),
        vec![Some("1234AB"), Some("1234AB"), Some("12345"), Some("1234AB")]
    );
    assert_eq!(
        floats(df, "car_eng_pow"),
        vec![Some(90.0), Some(-1.0), Some(300.0), Some(150.0)]
    );
    assert_eq!(
        floats(df, "customer_age"),
        vec![Some(35.0), Some(-1.0), Some(19.0), Some(45.0)]
    );
    assert_eq!(
        floats(df, "claim_amount"),
        vec![Some(0.0), Some(100.0), Some(0.0), Some(250.5)]
    );
    assert_eq!(
        strings(df, "marital_status"),
        vec![Some("Single"), Some("Single"), Some("Married"), Some("Married")]
    );

    for column in ["car_eng_pow", "customer_age", "claim_amount", "marital_status"] {
        assert_eq!(df.column(column)?.null_count(), 0, "{column} has nulls");
    }
    Ok(())
}

#[test]
fn postal_codes_are_alphanumeric() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();
    for code in strings(&output.dataframe, "postal_code").into_iter().flatten() {
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()), "{code}");
    }
    Ok(())
}

#[test]
fn derives_car_age_and_groups() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();
    let df = &output.dataframe;

    assert_eq!(
        floats(df, "car_age"),
        vec![Some(10.0), Some(5.0), Some(1.0), Some(15.0)]
    );
    assert_eq!(
        strings(df, "car_age_group"),
        vec![
            Some("[8, 11.5)"),
            Some("[4.5, 8)"),
            Some("[1, 4.5)"),
            Some("[11.5, 15.014)"),
        ]
    );
    assert_eq!(
        strings(df, "car_eng_pow_group"),
        vec![Some("0-100"), None, Some("250+"), Some("100-250")]
    );
    // Unknown (-1) and under-20 ages take the lowest decade seen in the data.
    assert_eq!(
        strings(df, "customer_age_group"),
        vec![Some("[30, 40)"), Some("[30, 40)"), Some("[30, 40)"), Some("[40, 50)")]
    );
    Ok(())
}

#[test]
fn car_age_matches_days_since_registration() -> PolarsResult<()> {
    let today = NaiveDate::from_ymd_opt(2024, 10, 18).unwrap();
    let output = transform(&joined()?, &TransformOptions::new(today)).unwrap();
    let years = [2015, 2020, 2024, 2010];

    for (age, year) in floats(&output.dataframe, "car_age").into_iter().zip(years) {
        let registered = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let expected =
            ((today - registered).num_days() as f64 / DAYS_PER_YEAR * 10.0).round() / 10.0;
        let age = age.unwrap();
        assert_eq!(age, expected);
        assert!(age >= 0.0);
    }
    Ok(())
}

#[test]
fn exposure_is_clamped_and_zero_without_claims() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();
    let df = &output.dataframe;
    let exposure = floats(df, "exposure");
    let claims = floats(df, "claim_amount");

    // Six months but no claim.
    assert_eq!(exposure[0], Some(0.0));
    // Two years with a claim is capped.
    assert_eq!(exposure[1], Some(1.0));
    // Imputed zero claim.
    assert_eq!(exposure[2], Some(0.0));
    let quarter = exposure[3].unwrap();
    assert!((quarter - 90.0 / DAYS_PER_YEAR).abs() < 1e-12);

    for (value, claim) in exposure.iter().zip(&claims) {
        let value = value.unwrap();
        assert!((0.0..=1.0).contains(&value));
        if *claim == Some(0.0) {
            assert_eq!(value, 0.0);
        }
    }

    assert!(output.steps.contains(&TransformStep::ExposureDerived {
        capped: 1,
        floored: 0,
        zeroed_by_claim: 2,
    }));
    Ok(())
}

#[test]
fn policy_dates_become_date_columns() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();
    assert_eq!(output.dataframe.column("policy_start")?.dtype(), &DataType::Date);
    assert_eq!(output.dataframe.column("policy_end")?.dtype(), &DataType::Date);
    Ok(())
}

#[test]
fn steps_are_recorded_in_order() -> PolarsResult<()> {
    let output = transform(&joined()?, &TransformOptions::new(today())).unwrap();

    assert_eq!(
        output.steps.first(),
        Some(&TransformStep::ModeImputed {
            column: "car_brand",
            fill: Some("VW".to_string()),
            filled: 1,
        })
    );
    assert!(matches!(
        output.steps.last(),
        Some(TransformStep::ExposureDerived { .. })
    ));
    assert!(output.steps.contains(&TransformStep::GroupBackfilled {
        column: "customer_age_group",
        label: "[30, 40)".to_string(),
        filled: 2,
    }));
    Ok(())
}

#[test]
fn input_frame_is_left_untouched() -> PolarsResult<()> {
    let input = joined()?;
    let before = input.clone();
    let _ = transform(&input, &TransformOptions::new(today())).unwrap();
    assert!(input.equals_missing(&before));
    assert!(input.column("exposure").is_err());
    Ok(())
}

#[test]
fn fixed_backfill_label_is_used() -> PolarsResult<()> {
    let mut options = TransformOptions::new(today());
    options.customer_age_backfill = AgeGroupBackfill::Label("unknown".to_string());

    let output = transform(&joined()?, &options).unwrap();
    assert_eq!(
        strings(&output.dataframe, "customer_age_group"),
        vec![Some("[30, 40)"), Some("unknown"), Some("unknown"), Some("[40, 50)")]
    );
    Ok(())
}

#[test]
fn no_age_in_any_bin_falls_back_to_first_decade() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("-1").alias("customer_age"))
        .collect()?;
    let output = transform(&df, &TransformOptions::new(today())).unwrap();
    for label in strings(&output.dataframe, "customer_age_group") {
        assert_eq!(label, Some("[20, 30)"));
    }
    Ok(())
}

#[test]
fn claim_override_scenario() -> PolarsResult<()> {
    let df = df![
        "policy_id" => ["7"],
        "car_brand" => ["VW"],
        "postal_code" => ["1000"],
        "car_eng_pow" => ["120"],
        "customer_age" => ["40"],
        "claim_amount" => ["0"],
        "marital_status" => ["1"],
        "car_registration_year" => ["2015"],
        "policy_start" => ["2022-01-01"],
        "policy_end" => ["2022-07-01"],
    ]?;
    let output = transform(&df, &TransformOptions::new(today())).unwrap();
    assert_eq!(floats(&output.dataframe, "exposure"), vec![Some(0.0)]);
    Ok(())
}

#[test]
fn long_policy_scenario_is_capped() -> PolarsResult<()> {
    let df = df![
        "policy_id" => ["8"],
        "car_brand" => ["VW"],
        "postal_code" => ["1000"],
        "car_eng_pow" => ["120"],
        "customer_age" => ["40"],
        "claim_amount" => ["100"],
        "marital_status" => ["2"],
        "car_registration_year" => ["2015"],
        "policy_start" => ["2021-01-01"],
        "policy_end" => ["2023-01-01"],
    ]?;
    let output = transform(&df, &TransformOptions::new(today())).unwrap();
    assert_eq!(floats(&output.dataframe, "exposure"), vec![Some(1.0)]);
    Ok(())
}

#[test]
fn missing_column_is_schema_error() -> PolarsResult<()> {
    let df = joined()?.drop("policy_end")?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    match err {
        PipelineError::Schema { column } => assert_eq!(column, "policy_end"),
        other => panic!("expected Schema, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unmatched_date_format_fails_loudly() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("01/07/2022").alias("policy_end"))
        .collect()?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    match err {
        PipelineError::InvalidValue { column, row, value, .. } => {
            assert_eq!(column, "policy_end");
            assert_eq!(row, 0);
            assert_eq!(value, "01/07/2022");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }

    let mut options = TransformOptions::new(today());
    options.date_formats = vec!["%Y-%m-%d".to_string(), "%d/%m/%Y".to_string()];
    let output = transform(&df, &options).unwrap();
    assert_eq!(output.dataframe.height(), 4);
    Ok(())
}

#[test]
fn unknown_marital_code_is_rejected() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("3").alias("marital_status"))
        .collect()?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidValue {
            column: "marital_status",
            ..
        }
    ));
    Ok(())
}

#[test]
fn non_numeric_engine_power_is_a_parse_error() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("fast").alias("car_eng_pow"))
        .collect()?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    Ok(())
}

#[test]
fn future_registration_year_is_rejected() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("2030").alias("car_registration_year"))
        .collect()?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidValue {
            column: "car_registration_year",
            ..
        }
    ));
    Ok(())
}

#[test]
fn infinite_age_is_a_parse_error() -> PolarsResult<()> {
    let df = joined()?
        .lazy()
        .with_column(lit("inf").alias("customer_age"))
        .collect()?;
    let err = transform(&df, &TransformOptions::new(today())).unwrap_err();
    match err {
        PipelineError::InvalidValue { column, value, .. } => {
            assert_eq!(column, "customer_age");
            assert_eq!(value, "inf");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
    Ok(())
}

#[test]
fn empty_table_still_records_car_age_grouping() -> PolarsResult<()> {
    let df = joined()?.head(Some(0));
    let output = transform(&df, &TransformOptions::new(today())).unwrap();

    assert_eq!(output.dataframe.height(), 0);
    assert!(output.dataframe.column("car_age_group").is_ok());
    assert!(output.steps.contains(&TransformStep::Grouped {
        column: "car_age_group".to_string(),
        labels: Vec::new(),
        unbinned: 0,
    }));
    Ok(())
}
