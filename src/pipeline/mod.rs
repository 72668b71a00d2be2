//! Pipeline components: discovery walk, line workers, coordinator, error handling.

pub mod context;
pub mod error_handler;
pub mod lines;
pub mod orchestrator;
pub mod state;
pub mod walk;

pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, PipelineTuning, WorkerContext,
    create_pipeline_channels,
};
pub use error_handler::{join_stage, raise_on_error, report_fatal};
pub use lines::{FileOutcome, WorkerReport, process_bytes, process_file, spawn_line_workers};
pub use orchestrator::{PipelineHooks, finish_pipeline, run_pipeline, start_pipeline};
pub use state::{PipelineState, ProgressSnapshot};
pub use walk::{WalkOutcome, run_walk_loop, spawn_walk_thread, to_outcome_jwalk, to_outcome_walkdir};
