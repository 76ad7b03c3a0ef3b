pub mod event_log;
pub mod pipeline;
pub mod status;

pub use pipeline::{
    remap_session, run_pipeline, PipelineContext, RunFailure, RunOptions, RunReport,
    STATUS_FINISHED,
};
pub use status::{CollectStatus, StatusSink, StdoutStatus};
