//! Provisioning of the native continuous-query engine.
//!
//! The engine is produced inside a query directory that sits two levels
//! below the platform root, next to which `bin/` holds the control-exit
//! binary and the query translator:
//!
//! ```text
//! <root>/bin/gsexit
//! <root>/bin/translate_fta
//! <root>/<a>/<b>/        <- target directory: schema, query, generated sources
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use super::pipeline::{BuildPipeline, PipelineState};
use super::report::BuildReport;
use super::step::{ExternalStep, ProcessExecutor, StepExecutor};
use crate::error::ProvisionError;

pub const STAGE_COPY_CONTROL_BINARY: &str = "copy-control-binary";
pub const STAGE_TRANSLATE: &str = "translate";
pub const STAGE_COMPILE: &str = "compile";

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_SCHEMA_FILE: &str = "packet_schema.txt";
pub const DEFAULT_QUERY_FILE: &str = "query.gsql";

const COPY_CONTROL_BINARY: &str = "cp ../../bin/gsexit ./GSEXIT";
const TRANSLATE: &str = "../../bin/translate_fta -h localhost -c -S -M -C . \"$1\" \"$2\"";
const COMPILE: &str = "make";

/// Builds the engine binaries for one target directory.
///
/// Builders for different directories may run concurrently. Two builds of
/// the same directory must not overlap; nothing here prevents it.
#[derive(Debug, Clone)]
pub struct NativeEngineBuilder {
    target_dir: PathBuf,
    schema_file: String,
    query_file: String,
    stage_timeout: Duration,
}

impl NativeEngineBuilder {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            schema_file: DEFAULT_SCHEMA_FILE.to_string(),
            query_file: DEFAULT_QUERY_FILE.to_string(),
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn schema(mut self, file: impl Into<String>) -> Self {
        self.schema_file = file.into();
        self
    }

    pub fn query(mut self, file: impl Into<String>) -> Self {
        self.query_file = file.into();
        self
    }

    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// The three stages: copy the control binary, translate the query, compile.
    pub fn pipeline(&self) -> BuildPipeline {
        let dir = &self.target_dir;
        BuildPipeline::new()
            .stage(
                ExternalStep::shell(STAGE_COPY_CONTROL_BINARY, dir, COPY_CONTROL_BINARY),
                self.stage_timeout,
                "control binary copy failed",
            )
            .stage(
                ExternalStep::shell(STAGE_TRANSLATE, dir, TRANSLATE)
                    .arg(&self.schema_file)
                    .arg(&self.query_file),
                self.stage_timeout,
                "engine binary build failed",
            )
            .stage(
                ExternalStep::shell(STAGE_COMPILE, dir, COMPILE),
                self.stage_timeout,
                "engine binary make failed",
            )
    }

    pub async fn build(&self) -> Result<BuildReport, ProvisionError> {
        self.build_with(&ProcessExecutor, |_| {}).await
    }

    pub async fn build_with<E, F>(
        &self,
        executor: &E,
        observe: F,
    ) -> Result<BuildReport, ProvisionError>
    where
        E: StepExecutor,
        F: FnMut(&PipelineState),
    {
        info!(
            dir = %self.target_dir.display(),
            schema = %self.schema_file,
            query = %self.query_file,
            "provisioning stream engine binaries"
        );
        let started_at = Utc::now();
        let outcomes = self.pipeline().run_observed(executor, observe).await?;
        Ok(BuildReport::from_outcomes(
            &self.target_dir,
            started_at,
            &outcomes,
        ))
    }
}
