//! Out-of-process provisioning of the native stream engine.

mod builder;
mod pipeline;
mod report;
mod step;

pub use builder::{
    DEFAULT_QUERY_FILE, DEFAULT_SCHEMA_FILE, DEFAULT_STAGE_TIMEOUT, NativeEngineBuilder,
    STAGE_COMPILE, STAGE_COPY_CONTROL_BINARY, STAGE_TRANSLATE,
};
pub use pipeline::{BuildPipeline, PipelineState, Stage};
pub use report::{BuildReport, StageReport};
pub use step::{ExternalStep, ProcessExecutor, SHELL, StepExecutor, StepOutcome};
