mod logging;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use policyprep_core::PipelineConfig;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Combines raw policy extracts, cleans them and writes the processed dataset",
    long_about = None
)]
struct Cli {}

fn main() -> Result<()> {
    Cli::parse();
    dotenvy::dotenv().ok();

    let config = PipelineConfig::resolve().context("failed to load configuration")?;
    logging::init_logging(&config.log_path)?;
    info!(
        raw_dir = %config.raw_dir.display(),
        output = %config.output_path.display(),
        "starting policy data preparation"
    );

    let today = Local::now().date_naive();
    match policyprep_core::run(&config, today) {
        Ok(summary) => {
            info!(summary = %serde_json::to_string(&summary)?, "pipeline finished");
            Ok(())
        }
        Err(err) => {
            error!(kind = ?err.kind(), "pipeline failed: {err}");
            Err(err).context("policy data preparation failed")
        }
    }
}
