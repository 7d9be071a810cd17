//! Error types for convoy-workspace.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use convoy_core::RepoName;
use convoy_renderer::RenderError;

/// Fatal errors of the generate phase (writing task documents).
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`WorkspaceError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.into(),
        source,
    }
}

/// A `git` or `gh` invocation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    #[error("`{command}` failed with {message}")]
    Failed { command: String, message: String },

    #[error("`{command}` could not start: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` returned no output")]
    EmptyOutput { command: String },
}

/// Provisioning step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    /// `gh api user`: hosting-service identity (authentication).
    ResolveIdentity,
    CheckFork,
    CreateFork,
    Clone,
    InspectRemotes,
    ConfigureUpstream,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionStep::ResolveIdentity => "resolve identity",
            ProvisionStep::CheckFork => "check fork",
            ProvisionStep::CreateFork => "create fork",
            ProvisionStep::Clone => "clone",
            ProvisionStep::InspectRemotes => "inspect remotes",
            ProvisionStep::ConfigureUpstream => "configure upstream",
        };
        f.write_str(s)
    }
}

/// Non-fatal provisioning failure: the jobs of `repo` are skipped.
#[derive(Debug, Clone, Error)]
#[error("provisioning {repo} failed at step '{step}': {message}")]
pub struct ProvisionFailure {
    pub repo: RepoName,
    pub step: ProvisionStep,
    pub message: String,
}

impl ProvisionFailure {
    /// Identity could not be resolved; the user is not authenticated.
    pub fn is_auth(&self) -> bool {
        self.step == ProvisionStep::ResolveIdentity
    }
}

/// Non-fatal worktree failure: the job is skipped.
#[derive(Debug, Clone, Error)]
pub enum WorktreeError {
    #[error("branch '{branch}' not found locally, on upstream, or on origin")]
    BranchNotFound { branch: String },

    #[error("git worktree add failed for {path}: {message}")]
    AddFailed { path: PathBuf, message: String },

    #[error("failed to clear previous worktree at {path}: {message}")]
    Cleanup { path: PathBuf, message: String },
}
