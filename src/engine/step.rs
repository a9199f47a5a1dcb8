//! A single external command run to completion under a timeout.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ProvisionError;

/// Shell used for stages expressed as scripts.
pub const SHELL: &str = "/bin/sh";

/// How an external step ended. A non-zero `exit_code` is reported as-is;
/// deciding whether it is a failure is up to the caller. A process killed by
/// a signal reports `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub name: String,
    pub exit_code: i32,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalStep {
    name: String,
    working_dir: PathBuf,
    program: String,
    args: Vec<String>,
}

impl ExternalStep {
    pub fn new(
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        program: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// A step that runs `script` with `/bin/sh -c`. Extra `args` become the
    /// script's positional parameters `$1`, `$2`, ...
    pub fn shell(
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        script: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self::new(name.clone(), working_dir, SHELL)
            .arg("-c")
            .arg(script)
            .arg(name)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command in its working directory and waits for it to exit.
    ///
    /// If the process outlives `timeout` this returns
    /// [`ProvisionError::Timeout`] and leaves the process running.
    pub async fn run(&self, timeout: Duration) -> Result<StepOutcome, ProvisionError> {
        info!(stage = %self.name, dir = %self.working_dir.display(), "starting {}", self);
        let started = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProvisionError::Spawn {
                stage: self.name.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProvisionError::Spawn {
                stage: self.name.clone(),
                source,
            })?,
            Err(_) => {
                warn!(stage = %self.name, timeout_ms = timeout.as_millis() as u64, "step timed out");
                return Err(ProvisionError::Timeout {
                    stage: self.name.clone(),
                    timeout,
                });
            }
        };

        let outcome = StepOutcome {
            name: self.name.clone(),
            exit_code: output.status.code().unwrap_or(-1),
            elapsed: started.elapsed(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            stage = %self.name,
            exit_code = outcome.exit_code,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            stderr = %outcome.stderr.trim_end(),
            "step finished"
        );
        Ok(outcome)
    }
}

impl fmt::Display for ExternalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external steps. Pipelines are generic over this so their sequencing
/// can be exercised without spawning processes.
pub trait StepExecutor {
    fn execute(
        &self,
        step: &ExternalStep,
        timeout: Duration,
    ) -> impl Future<Output = Result<StepOutcome, ProvisionError>> + Send;
}

/// Executes steps as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl StepExecutor for ProcessExecutor {
    async fn execute(
        &self,
        step: &ExternalStep,
        timeout: Duration,
    ) -> Result<StepOutcome, ProvisionError> {
        step.run(timeout).await
    }
}
