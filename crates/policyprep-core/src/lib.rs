pub mod columns;
pub mod combine;
pub mod config;
pub mod error;
pub mod join;
pub mod output;
pub mod pipeline;
pub mod quality_report;
pub mod transform;

pub use config::{AgeGroupBackfill, PipelineConfig};
pub use error::{ErrorKind, PipelineError, Result};
pub use pipeline::{run, PipelineSummary};
