//! Template context — serializable rendering payload for one task document.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use convoy_core::Job;

use crate::error::RenderError;

/// Everything a task document template can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    /// `NNN_repo_branch` identifier, also the document file stem.
    pub task_id: String,
    pub sequence: usize,
    pub job: JobCtx,
    /// Directory the agent runs in (shared clone or worktree).
    pub workspace_path: String,
    /// Workflow guide, verbatim.
    pub guide: String,
    /// Task description, verbatim.
    pub task: String,
    pub meta: MetaCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCtx {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub upstream_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub convoy_version: String,
    pub generated_at: DateTime<Utc>,
}

impl TaskContext {
    pub fn new(
        task_id: impl Into<String>,
        sequence: usize,
        job: &Job,
        workspace_path: &Path,
        guide: &str,
        task: &str,
    ) -> Self {
        TaskContext {
            task_id: task_id.into(),
            sequence,
            job: JobCtx {
                org: job.org.0.clone(),
                repo: job.repo.0.clone(),
                branch: job.branch.0.clone(),
                upstream_url: job.upstream_url(),
            },
            workspace_path: workspace_path.display().to_string(),
            guide: guide.to_string(),
            task: task.to_string(),
            meta: MetaCtx {
                convoy_version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
            },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
