//! Ordered, fail-fast sequences of external steps.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use super::step::{ExternalStep, StepExecutor, StepOutcome};
use crate::error::ProvisionError;

/// One step of a pipeline, with its own timeout and the message reported
/// when it exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub step: ExternalStep,
    pub timeout: Duration,
    pub failure_message: String,
}

/// Observable progress of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running { stage: String },
    Succeeded,
    /// `exit_code` is `None` when the stage never produced one (timeout,
    /// launch failure).
    Failed { stage: String, exit_code: Option<i32> },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::NotStarted => write!(f, "NOT_STARTED"),
            PipelineState::Running { stage } => write!(f, "RUNNING({stage})"),
            PipelineState::Succeeded => write!(f, "SUCCEEDED"),
            PipelineState::Failed {
                stage,
                exit_code: Some(code),
            } => write!(f, "FAILED({stage}, {code})"),
            PipelineState::Failed {
                stage,
                exit_code: None,
            } => write!(f, "FAILED({stage})"),
        }
    }
}

/// Stages run strictly in order; the first stage that does not exit with 0
/// ends the run. A pipeline keeps no state between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPipeline {
    stages: Vec<Stage>,
}

impl BuildPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(
        mut self,
        step: ExternalStep,
        timeout: Duration,
        failure_message: impl Into<String>,
    ) -> Self {
        self.stages.push(Stage {
            step,
            timeout,
            failure_message: failure_message.into(),
        });
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub async fn run<E: StepExecutor>(
        &self,
        executor: &E,
    ) -> Result<Vec<StepOutcome>, ProvisionError> {
        self.run_observed(executor, |_| {}).await
    }

    /// Runs every stage, reporting each state change to `observe`.
    pub async fn run_observed<E, F>(
        &self,
        executor: &E,
        mut observe: F,
    ) -> Result<Vec<StepOutcome>, ProvisionError>
    where
        E: StepExecutor,
        F: FnMut(&PipelineState),
    {
        observe(&PipelineState::NotStarted);
        let mut outcomes = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let name = stage.step.name().to_string();
            observe(&PipelineState::Running {
                stage: name.clone(),
            });

            let outcome = match executor.execute(&stage.step, stage.timeout).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(stage = %name, error = %err, "stage did not complete");
                    observe(&PipelineState::Failed {
                        stage: name,
                        exit_code: None,
                    });
                    return Err(err);
                }
            };

            if !outcome.succeeded() {
                warn!(stage = %name, exit_code = outcome.exit_code, "{}", stage.failure_message);
                observe(&PipelineState::Failed {
                    stage: name.clone(),
                    exit_code: Some(outcome.exit_code),
                });
                return Err(ProvisionError::StageFailed {
                    stage: name,
                    exit_code: outcome.exit_code,
                    message: stage.failure_message.clone(),
                });
            }

            info!(stage = %name, elapsed_ms = outcome.elapsed.as_millis() as u64, "stage succeeded");
            outcomes.push(outcome);
        }

        observe(&PipelineState::Succeeded);
        Ok(outcomes)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeExecutor;
    use super::*;

    fn pipeline() -> BuildPipeline {
        let timeout = Duration::from_secs(1);
        BuildPipeline::new()
            .stage(ExternalStep::new("one", "/tmp", "true"), timeout, "one failed")
            .stage(ExternalStep::new("two", "/tmp", "true"), timeout, "two failed")
            .stage(ExternalStep::new("three", "/tmp", "true"), timeout, "three failed")
    }

    #[tokio::test]
    async fn runs_all_stages_in_order() {
        let exec = FakeExecutor::default();
        let outcomes = pipeline().run(&exec).await.unwrap();
        assert_eq!(exec.names(), vec!["one", "two", "three"]);
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn failure_stops_later_stages() {
        let exec = FakeExecutor::default().exit_with("two", 2);
        let err = pipeline().run(&exec).await.unwrap_err();
        assert_eq!(exec.names(), vec!["one", "two"]);
        match err {
            ProvisionError::StageFailed {
                stage,
                exit_code,
                message,
            } => {
                assert_eq!(stage, "two");
                assert_eq!(exit_code, 2);
                assert_eq!(message, "two failed");
            }
            other => panic!("expected StageFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_stops_later_stages() {
        let exec = FakeExecutor::default().time_out("one");
        let err = pipeline().run(&exec).await.unwrap_err();
        assert_eq!(exec.names(), vec!["one"]);
        assert!(matches!(err, ProvisionError::Timeout { .. }));
    }

    #[tokio::test]
    async fn observer_sees_state_sequence() {
        let exec = FakeExecutor::default().exit_with("three", 9);
        let mut states = Vec::new();
        let _ = pipeline()
            .run_observed(&exec, |s| states.push(s.to_string()))
            .await;
        assert_eq!(
            states,
            vec![
                "NOT_STARTED",
                "RUNNING(one)",
                "RUNNING(two)",
                "RUNNING(three)",
                "FAILED(three, 9)",
            ]
        );
    }

    #[tokio::test]
    async fn empty_pipeline_succeeds() {
        let exec = FakeExecutor::default();
        let outcomes = BuildPipeline::new().run(&exec).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
