//! Library side of the `trialdash` binary: run configuration, logging
//! setup and the staged report pipeline.

pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::ReportConfig;
pub use pipeline::{PipelineResult, RunOptions, run_pipeline};
