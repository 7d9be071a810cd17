//! Task materialization: one rendered document (and optionally one worktree)
//! per job.

use std::path::{Path, PathBuf};

use serde::Serialize;

use convoy_core::paths::task_document_path;
use convoy_core::Job;
use convoy_renderer::{TaskContext, TemplateEngine};

use crate::command::CommandRunner;
use crate::error::{io_err, WorkspaceError};
use crate::worktree::WorktreeManager;

/// A task ready to hand to the agent. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskArtifact {
    pub sequence: usize,
    pub task_id: String,
    pub job: Job,
    /// Directory the agent runs in.
    pub workspace_path: PathBuf,
    pub document_path: PathBuf,
    /// Full rendered document; fed to the agent on stdin.
    #[serde(skip)]
    pub content: String,
}

/// `{seq:03}_{repo}_{sanitized branch}`
pub fn task_id(sequence: usize, job: &Job) -> String {
    format!("{sequence:03}_{}_{}", job.repo, job.branch.sanitized())
}

/// Where each job's workspace comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceMode {
    /// All jobs of a repository share `workspace_root/<repo>`.
    Shared,
    /// Each job gets `<dir>/<task_id>` as a worktree of the shared clone.
    Worktree { dir: PathBuf },
}

/// Renders and writes task documents, numbering them as it goes.
pub struct Materializer<'a, R: CommandRunner> {
    engine: &'a TemplateEngine,
    runner: &'a R,
    tasks_dir: PathBuf,
    mode: WorkspaceMode,
    next_sequence: usize,
}

impl<'a, R: CommandRunner> Materializer<'a, R> {
    pub fn new(
        engine: &'a TemplateEngine,
        runner: &'a R,
        tasks_dir: impl Into<PathBuf>,
        mode: WorkspaceMode,
    ) -> Self {
        Materializer {
            engine,
            runner,
            tasks_dir: tasks_dir.into(),
            mode,
            next_sequence: 1,
        }
    }

    /// Sequence number the next successful job will receive.
    pub fn next_sequence(&self) -> usize {
        self.next_sequence
    }

    /// Materialize `job`. `Ok(None)` means the job was skipped (its worktree
    /// could not be created); the sequence counter is left untouched.
    pub fn materialize(
        &mut self,
        job: &Job,
        guide: &str,
        task: &str,
        workspace_root: &Path,
    ) -> Result<Option<TaskArtifact>, WorkspaceError> {
        let sequence = self.next_sequence;
        let id = task_id(sequence, job);
        let clone_path = workspace_root.join(&job.repo.0);

        let workspace_path = match &self.mode {
            WorkspaceMode::Shared => clone_path,
            WorkspaceMode::Worktree { dir } => {
                let target = dir.join(&id);
                match WorktreeManager::new(self.runner).create(&clone_path, &target, &job.branch) {
                    Ok(path) => path,
                    Err(err) => {
                        tracing::warn!(job = %job, error = %err, "skipping job: worktree not created");
                        return Ok(None);
                    }
                }
            }
        };

        let ctx = TaskContext::new(&id, sequence, job, &workspace_path, guide, task);
        let content = self.engine.render(&ctx)?;
        let document_path = task_document_path(&self.tasks_dir, &id);
        write_atomic(&document_path, &content)?;

        self.next_sequence += 1;
        tracing::debug!(task = %id, path = %document_path.display(), "task document written");
        Ok(Some(TaskArtifact {
            sequence,
            task_id: id,
            job: job.clone(),
            workspace_path,
            document_path,
            content,
        }))
    }
}

/// Write `<path>.tmp`, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), WorkspaceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
