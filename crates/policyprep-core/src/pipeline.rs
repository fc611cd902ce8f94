use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::combine::{combine_files, CsvOptions};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::join::join_reference;
use crate::output::write_csv_atomic;
use crate::quality_report::quality_report;
use crate::transform::{transform, TransformOptions};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub files: Vec<String>,
    pub combined_rows: usize,
    pub output_rows: usize,
    pub output_columns: usize,
    pub output_path: PathBuf,
}

/// Runs combine, join, quality report, transform and write, in that order.
/// `today` anchors the car-age calculation.
pub fn run(config: &PipelineConfig, today: NaiveDate) -> Result<PipelineSummary> {
    config.validate()?;
    let csv = CsvOptions {
        null_values: config.null_values.clone(),
    };

    let combined = combine_files(&config.raw_dir, &config.file_prefix, &csv)?;
    for source in &combined.sources {
        info!(file = %source.file_name, rows = source.rows, "combined raw extract");
    }
    let combined_rows = combined.dataframe.height();

    let joined = join_reference(&combined.dataframe, &config.reference_path, &csv)?;
    info!(
        rows = joined.height(),
        columns = joined.width(),
        reference = %config.reference_path.display(),
        "joined policy reference table"
    );

    quality_report(&joined)?.log();

    let output = transform(&joined, &TransformOptions::from_config(config, today))?;
    for step in &output.steps {
        info!("{step}");
    }

    write_csv_atomic(&output.dataframe, &config.output_path)?;
    info!(path = %config.output_path.display(), "processed dataset written");

    Ok(PipelineSummary {
        files: combined
            .sources
            .into_iter()
            .map(|source| source.file_name)
            .collect(),
        combined_rows,
        output_rows: output.dataframe.height(),
        output_columns: output.dataframe.width(),
        output_path: config.output_path.clone(),
    })
}
