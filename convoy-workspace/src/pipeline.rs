//! Generate pipeline: provision every repository, then materialize every job.
//!
//! Shared entrypoint for `convoy run` (generate phase) and `convoy clean`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use convoy_core::paths::{tasks_dir, worktrees_dir, TASK_EXTENSION};
use convoy_core::{Job, OrgName, RepoName};
use convoy_renderer::{parse_artifact, TemplateEngine};

use crate::command::CommandRunner;
use crate::error::{io_err, ProvisionFailure, WorkspaceError};
use crate::materialize::{Materializer, TaskArtifact, WorkspaceMode};
use crate::provision::{ProvisionOptions, Provisioner};
use crate::worktree::{owning_repository, WorktreeManager};

/// Everything the generate phase needs.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub root: &'a Path,
    pub bundle: &'a str,
    pub jobs: &'a [Job],
    pub guide: &'a str,
    pub task: &'a str,
    pub shallow: bool,
    pub worktree: bool,
}

/// A job that produced no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedJob {
    pub job: Job,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub artifacts: Vec<TaskArtifact>,
    pub skipped: Vec<SkippedJob>,
}

/// Provision and materialize `req.jobs` into `<root>/tasks/<bundle>/`.
///
/// Previously generated documents are removed first. Provisioning failures
/// and worktree failures skip the affected jobs; only I/O and render errors
/// are fatal.
pub fn generate<R: CommandRunner>(
    runner: &R,
    engine: &TemplateEngine,
    workspace_root: &Path,
    req: &GenerateRequest<'_>,
) -> Result<GenerationReport, WorkspaceError> {
    let tasks = tasks_dir(req.root, req.bundle);
    let cleared = clear_task_documents(&tasks)?;
    if cleared > 0 {
        tracing::debug!(count = cleared, dir = %tasks.display(), "cleared stale task documents");
    }

    let failures = provision_all(runner, workspace_root, req.jobs, req.shallow);

    let mode = if req.worktree {
        WorkspaceMode::Worktree {
            dir: worktrees_dir(req.root, req.bundle),
        }
    } else {
        WorkspaceMode::Shared
    };
    let mut materializer = Materializer::new(engine, runner, &tasks, mode);
    let mut report = GenerationReport::default();

    for job in req.jobs {
        if let Some(failure) = failures.get(&job.repo) {
            report.skipped.push(SkippedJob {
                job: job.clone(),
                reason: failure.to_string(),
            });
            continue;
        }
        match materializer.materialize(job, req.guide, req.task, workspace_root)? {
            Some(artifact) => report.artifacts.push(artifact),
            None => report.skipped.push(SkippedJob {
                job: job.clone(),
                reason: "worktree could not be created".to_string(),
            }),
        }
    }

    tracing::info!(
        generated = report.artifacts.len(),
        skipped = report.skipped.len(),
        "generation finished"
    );
    Ok(report)
}

/// Provision each distinct repository once, using the first org it appears
/// under. Returns the failures keyed by repository.
fn provision_all<R: CommandRunner>(
    runner: &R,
    workspace_root: &Path,
    jobs: &[Job],
    shallow: bool,
) -> BTreeMap<RepoName, ProvisionFailure> {
    let mut owners: Vec<(&RepoName, &OrgName)> = Vec::new();
    for job in jobs {
        match owners.iter().find(|(repo, _)| *repo == &job.repo) {
            Some((_, org)) if *org != &job.org => {
                tracing::warn!(
                    repo = %job.repo,
                    using = %org,
                    ignored = %job.org,
                    "repository listed under several organizations; one local clone is shared"
                );
            }
            Some(_) => {}
            None => owners.push((&job.repo, &job.org)),
        }
    }

    let mut provisioner = Provisioner::new(runner);
    let mut failures = BTreeMap::new();
    for (repo, org) in owners {
        match provisioner.ensure_repository(org, repo, workspace_root, ProvisionOptions { shallow }) {
            Ok(handle) => {
                tracing::info!(repo = %repo, path = %handle.path.display(), cloned = handle.cloned, "repository ready");
            }
            Err(failure) => {
                if failure.is_auth() {
                    tracing::warn!(repo = %repo, error = %failure, "not authenticated with gh; skipping repository");
                } else {
                    tracing::warn!(repo = %repo, error = %failure, "skipping repository");
                }
                failures.insert(repo.clone(), failure);
            }
        }
    }
    failures
}

/// Rebuild artifacts from previously generated documents, for run-only mode.
///
/// Documents that do not parse are skipped with a warning. The result is
/// ordered by (sequence, task id).
pub fn load_artifacts(tasks_dir: &Path) -> Result<Vec<TaskArtifact>, WorkspaceError> {
    let mut artifacts = Vec::new();
    for path in task_documents(tasks_dir)? {
        let parsed = match parse_artifact(&path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable task document");
                continue;
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        artifacts.push(TaskArtifact {
            sequence: parsed.sequence.unwrap_or(usize::MAX),
            task_id: parsed.task_id,
            job: parsed.job,
            workspace_path: parsed.workspace_path,
            document_path: path,
            content,
        });
    }
    artifacts.sort_by(|a, b| (a.sequence, &a.task_id).cmp(&(b.sequence, &b.task_id)));
    Ok(artifacts)
}

/// `*.md` files directly under `dir`, sorted by name. Missing dir → empty.
fn task_documents(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(TASK_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn clear_task_documents(dir: &Path) -> Result<usize, WorkspaceError> {
    let paths = task_documents(dir)?;
    for path in &paths {
        std::fs::remove_file(path).map_err(|e| io_err(path, e))?;
    }
    Ok(paths.len())
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub documents_removed: usize,
    pub worktrees_removed: usize,
}

/// Remove the bundle's generated task documents and, when `worktrees` is set,
/// its worktrees.
pub fn clean<R: CommandRunner>(
    runner: &R,
    root: &Path,
    bundle: &str,
    worktrees: bool,
) -> Result<CleanReport, WorkspaceError> {
    let mut report = CleanReport {
        documents_removed: clear_task_documents(&tasks_dir(root, bundle))?,
        ..Default::default()
    };
    if !worktrees {
        return Ok(report);
    }

    let dir = worktrees_dir(root, bundle);
    if !dir.is_dir() {
        return Ok(report);
    }
    let manager = WorktreeManager::new(runner);
    for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let path = entry.map_err(|e| io_err(&dir, e))?.path();
        if !path.is_dir() {
            continue;
        }
        let removed = match owning_repository(&path) {
            Some(repo) => manager.remove(&repo, &path).map_err(|e| e.to_string()),
            None => std::fs::remove_dir_all(&path).map_err(|e| e.to_string()),
        };
        match removed {
            Ok(()) => report.worktrees_removed += 1,
            Err(error) => tracing::warn!(path = %path.display(), %error, "could not remove worktree"),
        }
    }
    Ok(report)
}
