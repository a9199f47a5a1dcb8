use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::StepOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Summary of a successful engine build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub build_id: String,
    pub target_dir: PathBuf,
    pub stages: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl BuildReport {
    pub fn from_outcomes(
        target_dir: &Path,
        started_at: DateTime<Utc>,
        outcomes: &[StepOutcome],
    ) -> Self {
        let now = Utc::now();
        let stages = outcomes
            .iter()
            .map(|o| StageReport {
                name: o.name.clone(),
                exit_code: o.exit_code,
                duration_ms: o.elapsed.as_millis() as u64,
            })
            .collect();

        Self {
            build_id: Uuid::new_v4().to_string(),
            target_dir: target_dir.to_path_buf(),
            stages,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}
