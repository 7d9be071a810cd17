//! Run aggregation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use convoy_core::paths::SUMMARY_FILE;

use crate::error::{io_err, RunnerError};
use crate::executor::TaskResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub duration_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub tasks: Vec<TaskResult>,
}

impl RunSummary {
    /// Count results by their success flag. The run spans the earliest start
    /// to the latest end.
    pub fn from_results(results: &[TaskResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let now = Utc::now();
        let started_at = results.iter().map(|r| r.started_at).min().unwrap_or(now);
        let ended_at = results.iter().map(|r| r.ended_at).max().unwrap_or(now);
        let duration_seconds = (ended_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        RunSummary {
            successful,
            failed: results.len() - successful,
            total: results.len(),
            duration_seconds,
            started_at,
            ended_at,
            tasks: results.to_vec(),
        }
    }

    /// 1 if any task failed, else 0.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed > 0)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.tasks.iter().filter(|t| !t.success)
    }

    /// Write `summary.json` into `dir` (`.tmp` + rename).
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, RunnerError> {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let path = dir.join(SUMMARY_FILE);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
        Ok(path)
    }

    pub fn load_json(dir: &Path) -> Result<Self, RunnerError> {
        let path = dir.join(SUMMARY_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}
