use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use glob::Pattern;
use polars::prelude::*;
use tracing::debug;

use crate::columns::FILE_NAME;
use crate::error::{PipelineError, Result};

/// Options shared by every CSV read in the pipeline.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub null_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            null_values: ["", "NA", "NaN", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct CombinedFiles {
    pub dataframe: DataFrame,
    pub sources: Vec<SourceFile>,
}

/// Reads one CSV file with a header row. Every column is read as String so that
/// frames from different extracts stack without dtype conflicts.
pub fn load_csv(path: &Path, options: &CsvOptions) -> Result<DataFrame> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(err.into()),
    };

    let parse_options = CsvParseOptions::default().with_null_values(Some(
        NullValues::AllColumns(options.null_values.iter().map(|v| v.as_str().into()).collect()),
    ));

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .map_err(|err| PipelineError::MalformedCsv {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Regular files in `dir` whose name starts with `prefix`, in file-name order.
pub fn list_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let dir_str = dir.to_str().ok_or_else(|| {
        PipelineError::Config(format!("raw directory {} is not valid UTF-8", dir.display()))
    })?;
    let pattern = Path::new(&Pattern::escape(dir_str)).join(format!("{}*", Pattern::escape(prefix)));
    let pattern_str = pattern.to_string_lossy();

    let mut files = Vec::new();
    for entry in glob::glob(&pattern_str).map_err(|err| PipelineError::Config(err.to_string()))? {
        let path = entry.map_err(|err| PipelineError::Io(err.into()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every matching file in `dir`, tags rows with `file_Name`, and stacks
/// them in file order then row order.
pub fn combine_files(dir: &Path, prefix: &str, options: &CsvOptions) -> Result<CombinedFiles> {
    let paths = list_files(dir, prefix)?;
    if paths.is_empty() {
        return Err(PipelineError::NoMatchingFiles {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        });
    }

    let mut frames = Vec::with_capacity(paths.len());
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut df = load_csv(&path, options)?;
        let rows = df.height();
        df.with_column(Series::new(FILE_NAME.into(), vec![file_name.as_str(); rows]))?;
        debug!(file = %file_name, rows, "loaded raw extract");

        frames.push(df);
        sources.push(SourceFile {
            file_name,
            path,
            rows,
        });
    }

    Ok(CombinedFiles {
        dataframe: stack_frames(frames)?,
        sources,
    })
}

/// Vertically concatenates frames, aligning columns by name. The result holds
/// the union of columns in first-seen order; a frame lacking a column
/// contributes nulls for it.
pub fn stack_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut names: Vec<PlSmallStr> = Vec::new();
    let mut dtypes: Vec<DataType> = Vec::new();
    for df in &frames {
        for column in df.get_columns() {
            if !names.contains(column.name()) {
                names.push(column.name().clone());
                dtypes.push(column.dtype().clone());
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for df in frames {
        let height = df.height();
        let mut columns: Vec<Column> = Vec::with_capacity(names.len());
        for (name, dtype) in names.iter().zip(&dtypes) {
            let column = match df.column(name.as_str()) {
                Ok(column) if column.dtype() == dtype => column.clone(),
                Ok(column) => column.cast(dtype)?,
                Err(_) => Series::full_null(name.clone(), height, dtype).into(),
            };
            columns.push(column);
        }
        let aligned = DataFrame::new(columns)?;

        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => combined = Some(aligned),
        }
    }

    Ok(combined.unwrap_or_default())
}
