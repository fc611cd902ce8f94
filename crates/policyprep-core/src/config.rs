use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "POLICYPREP_CONFIG";
/// Configuration file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "policyprep.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    /// Only files whose name starts with this prefix are combined. Empty
    /// includes every file in `raw_dir`.
    pub file_prefix: String,
    pub reference_path: PathBuf,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    /// Cell contents read as missing.
    pub null_values: Vec<String>,
    /// `chrono` format strings tried in order for policy dates.
    pub date_formats: Vec<String>,
    pub customer_age_backfill: AgeGroupBackfill,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            file_prefix: "task_data".to_string(),
            reference_path: PathBuf::from("data/external/POLICY_DATA.csv"),
            output_path: PathBuf::from("data/processed/task_data.csv"),
            log_path: PathBuf::from("logs/data_quality"),
            null_values: ["", "NA", "NaN", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            date_formats: vec!["%Y-%m-%d".to_string()],
            customer_age_backfill: AgeGroupBackfill::LowestObserved,
        }
    }
}

/// How rows whose customer age falls outside every bin get a group label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroupBackfill {
    /// The smallest bin label present in the data.
    #[default]
    LowestObserved,
    /// A fixed label.
    Label(String),
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|err| PipelineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolves the configuration from `POLICYPREP_CONFIG`, then
    /// `policyprep.toml` in the working directory, then built-in defaults.
    pub fn resolve() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_formats.is_empty() {
            return Err(PipelineError::Config(
                "date_formats must list at least one format".to_string(),
            ));
        }
        if let AgeGroupBackfill::Label(label) = &self.customer_age_backfill {
            if label.trim().is_empty() {
                return Err(PipelineError::Config(
                    "customer_age_backfill label must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
