use std::fs;
use std::path::Path;

use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::error::{PipelineError, Result};

/// Writes `df` as comma-separated CSV with a header row and no index column.
///
/// The frame is written to a temporary file beside `path` and renamed over it
/// once complete, so a failed write never leaves a partial file at `path`.
pub fn write_csv_atomic(df: &DataFrame, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    let mut frame = df.clone();
    CsvWriter::new(staged.as_file_mut())
        .include_header(true)
        .with_separator(b',')
        .finish(&mut frame)?;
    staged.as_file_mut().sync_all()?;

    staged
        .persist(path)
        .map_err(|err| PipelineError::Io(err.error))?;
    Ok(())
}
