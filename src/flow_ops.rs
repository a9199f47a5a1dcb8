//! Operator-facing flow operations.
//!
//! The shell talks to running flows through [`FlowOperations`]. The local
//! implementation tracks each running flow by a pid file at
//! `<flows_dir>/<flow>/flow.pid` and stops it by sending `SIGTERM`.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::engine::ExternalStep;
use crate::error::FlowOpsError;

pub const PID_FILE: &str = "flow.pid";

const KILL_TIMEOUT: Duration = Duration::from_secs(10);

pub trait FlowOperations {
    /// Requests termination of the named running flow.
    fn stop_flow(&self, flow_name: &str) -> impl Future<Output = Result<(), FlowOpsError>> + Send;
}

#[derive(Debug, Clone)]
pub struct LocalFlowOperations {
    flows_dir: PathBuf,
}

impl LocalFlowOperations {
    pub fn new(flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            flows_dir: flows_dir.into(),
        }
    }

    fn pid_file(&self, flow_name: &str) -> PathBuf {
        self.flows_dir.join(flow_name).join(PID_FILE)
    }

    fn read_pid(&self, flow_name: &str) -> Result<u32, FlowOpsError> {
        let path = self.pid_file(flow_name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FlowOpsError::NotRunning(flow_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        text.trim()
            .parse::<u32>()
            .map_err(|e| FlowOpsError::InvalidPid {
                flow: flow_name.to_string(),
                reason: e.to_string(),
            })
    }
}

impl FlowOperations for LocalFlowOperations {
    async fn stop_flow(&self, flow_name: &str) -> Result<(), FlowOpsError> {
        let pid = self.read_pid(flow_name)?;
        let flow_dir = self.flows_dir.join(flow_name);
        let outcome = ExternalStep::shell("stop-flow", &flow_dir, "kill \"$1\"")
            .arg(pid.to_string())
            .run(KILL_TIMEOUT)
            .await?;
        if !outcome.succeeded() {
            return Err(FlowOpsError::SignalFailed {
                flow: flow_name.to_string(),
                exit_code: outcome.exit_code,
            });
        }
        fs::remove_file(self.pid_file(flow_name))?;
        info!(flow = %flow_name, pid, "flow stopped");
        Ok(())
    }
}

/// `stop <flow-name>`: stops a flow.
pub struct StopCommand<O> {
    operations: O,
}

impl<O: FlowOperations> StopCommand<O> {
    pub fn new(operations: O) -> Self {
        Self { operations }
    }

    pub async fn execute(&self, flow_name: &str) -> Result<(), FlowOpsError> {
        self.operations.stop_flow(flow_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingOps {
        stopped: Mutex<Vec<String>>,
    }

    impl FlowOperations for &RecordingOps {
        async fn stop_flow(&self, flow_name: &str) -> Result<(), FlowOpsError> {
            if flow_name == "missing" {
                return Err(FlowOpsError::NotRunning(flow_name.into()));
            }
            self.stopped.lock().unwrap().push(flow_name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn stop_command_delegates_to_operations() {
        let ops = RecordingOps::default();
        StopCommand::new(&ops).execute("PacketCount").await.unwrap();
        assert_eq!(*ops.stopped.lock().unwrap(), vec!["PacketCount"]);
    }

    #[tokio::test]
    async fn stop_command_propagates_errors() {
        let ops = RecordingOps::default();
        let err = StopCommand::new(&ops).execute("missing").await.unwrap_err();
        assert!(matches!(err, FlowOpsError::NotRunning(name) if name == "missing"));
    }

    #[tokio::test]
    async fn local_stop_without_pid_file_is_not_running() {
        let tmp = TempDir::new().unwrap();
        let ops = LocalFlowOperations::new(tmp.path());
        let err = ops.stop_flow("PacketCount").await.unwrap_err();
        assert!(matches!(err, FlowOpsError::NotRunning(_)));
    }

    #[tokio::test]
    async fn local_stop_rejects_garbage_pid() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("PacketCount");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PID_FILE), "not-a-pid").unwrap();
        let err = LocalFlowOperations::new(tmp.path())
            .stop_flow("PacketCount")
            .await
            .unwrap_err();
        assert!(matches!(err, FlowOpsError::InvalidPid { .. }));
    }

    #[tokio::test]
    async fn local_stop_kills_process_and_clears_pid_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("PacketCount");
        fs::create_dir_all(&dir).unwrap();
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(dir.join(PID_FILE), child.id().to_string()).unwrap();

        LocalFlowOperations::new(tmp.path())
            .stop_flow("PacketCount")
            .await
            .unwrap();

        assert!(!dir.join(PID_FILE).exists());
        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
