pub mod config;
pub mod ingest;
pub mod outcome;
pub mod runner;
pub mod stages;
pub mod state;
pub mod trim_plan;

pub use config::PipelineConfig;
pub use outcome::{StageError, StageOutcome};
