//! Running one artifact and recording the result.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use convoy_core::paths::task_log_path;
use convoy_core::Job;
use convoy_workspace::TaskArtifact;

use crate::agent::{AgentInvocation, AgentOutcome, AgentRunner};
use crate::scheduler::RunOptions;

/// Outcome of one task. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_name: String,
    pub job: Job,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl TaskResult {
    /// Failed result for a task that never ran.
    pub fn not_run(task_name: impl Into<String>, job: Job, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        TaskResult {
            task_name: task_name.into(),
            job,
            success: false,
            started_at: now,
            ended_at: now,
            duration_seconds: 0.0,
            log_path: None,
            error: Some(reason.into()),
            exit_code: None,
        }
    }

    /// Failed result for a job dropped during generation.
    pub fn skipped(job: Job, reason: impl Into<String>) -> Self {
        let name = format!("{}_{}", job.repo, job.branch.sanitized());
        Self::not_run(name, job, reason)
    }
}

/// Run `artifact` through `agent` and time it.
pub async fn execute(
    agent: &dyn AgentRunner,
    artifact: &TaskArtifact,
    opts: &RunOptions,
    cancel: watch::Receiver<bool>,
) -> TaskResult {
    if *cancel.borrow() {
        return TaskResult::not_run(&artifact.task_id, artifact.job.clone(), "cancelled before start");
    }
    if !artifact.workspace_path.is_dir() {
        tracing::warn!(task = %artifact.task_id, path = %artifact.workspace_path.display(), "workspace path missing");
        return TaskResult::not_run(
            &artifact.task_id,
            artifact.job.clone(),
            format!("workspace path {} does not exist", artifact.workspace_path.display()),
        );
    }

    let log_path = opts
        .log_dir
        .as_deref()
        .map(|dir| task_log_path(dir, &artifact.task_id));
    let invocation = AgentInvocation {
        task_id: artifact.task_id.clone(),
        workdir: artifact.workspace_path.clone(),
        input: artifact.content.clone(),
        log_path: log_path.clone(),
        timeout: opts.task_timeout,
    };

    tracing::info!(task = %artifact.task_id, job = %artifact.job, "task started");
    let started_at = Utc::now();
    let clock = Instant::now();
    let outcome = agent.run(invocation, cancel).await;
    let duration_seconds = clock.elapsed().as_secs_f64();
    let ended_at = Utc::now();

    let (exit_code, error) = match &outcome {
        AgentOutcome::Exited { code: Some(0) } => (Some(0), None),
        AgentOutcome::Exited { code: Some(code) } => {
            (Some(*code), Some(format!("agent exited with code {code}")))
        }
        AgentOutcome::Exited { code: None } => (None, Some("agent terminated by signal".to_string())),
        AgentOutcome::Failed(message) => (None, Some(message.clone())),
        AgentOutcome::Cancelled => (None, Some("cancelled".to_string())),
        AgentOutcome::TimedOut(limit) => (
            None,
            Some(format!("timed out after {}s", limit.as_secs())),
        ),
    };
    let success = outcome.success();
    if success {
        tracing::info!(task = %artifact.task_id, duration = duration_seconds, "task succeeded");
    } else {
        tracing::warn!(
            task = %artifact.task_id,
            duration = duration_seconds,
            error = error.as_deref().unwrap_or_default(),
            "task failed"
        );
    }

    TaskResult {
        task_name: artifact.task_id.clone(),
        job: artifact.job.clone(),
        success,
        started_at,
        ended_at,
        duration_seconds,
        log_path,
        error,
        exit_code,
    }
}
