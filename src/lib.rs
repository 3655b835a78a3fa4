pub mod analytics;
pub mod config;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod reporting;

pub use errors::{IngestError, PipelineError};
pub use ingestion::pipeline::{run_pipeline, PipelineConfig, PipelineReport};
