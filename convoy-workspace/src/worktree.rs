//! Per-task git worktrees.

use std::path::{Path, PathBuf};

use convoy_core::BranchName;

use crate::command::CommandRunner;
use crate::error::WorktreeError;
use crate::git::Git;
use crate::provision::{ORIGIN_REMOTE, UPSTREAM_REMOTE};

/// Where a worktree's branch comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSource {
    /// Existing local branch.
    Local,
    /// Remote-tracking ref, e.g. `upstream/main`.
    Remote(String),
}

/// Creates and removes worktrees off a shared clone.
pub struct WorktreeManager<'r, R: CommandRunner> {
    git: Git<'r, R>,
}

impl<'r, R: CommandRunner> WorktreeManager<'r, R> {
    pub fn new(runner: &'r R) -> Self {
        WorktreeManager {
            git: Git::new(runner),
        }
    }

    /// Find `branch` as a local branch, then on `upstream`, then on `origin`.
    /// Remote branches are fetched first; fetch failures are not fatal.
    pub fn resolve_branch(&self, repo: &Path, branch: &BranchName) -> Option<BranchSource> {
        if self.git.ref_exists(repo, &format!("refs/heads/{branch}")) {
            return Some(BranchSource::Local);
        }
        for remote in [UPSTREAM_REMOTE, ORIGIN_REMOTE] {
            if let Err(error) = self.git.fetch_branch(repo, remote, &branch.0) {
                tracing::debug!(remote, branch = %branch, %error, "fetch failed");
            }
            let reference = format!("refs/remotes/{remote}/{branch}");
            if self.git.ref_exists(repo, &reference) {
                return Some(BranchSource::Remote(format!("{remote}/{branch}")));
            }
        }
        None
    }

    /// Check out `branch` of `repo` at `path`, replacing any worktree already
    /// there.
    pub fn create(
        &self,
        repo: &Path,
        path: &Path,
        branch: &BranchName,
    ) -> Result<PathBuf, WorktreeError> {
        if path.exists() {
            self.remove(repo, path)?;
        }
        let source = self
            .resolve_branch(repo, branch)
            .ok_or_else(|| WorktreeError::BranchNotFound {
                branch: branch.0.clone(),
            })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorktreeError::AddFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let result = match &source {
            BranchSource::Local => self.git.worktree_add(repo, path, &branch.0),
            BranchSource::Remote(start) => {
                self.git.worktree_add_tracking(repo, path, &branch.0, start)
            }
        };
        result.map_err(|e| WorktreeError::AddFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), branch = %branch, ?source, "worktree ready");
        Ok(path.to_path_buf())
    }

    /// Remove the worktree at `path`. Falls back to deleting the directory
    /// when git no longer knows about it, then prunes stale entries.
    pub fn remove(&self, repo: &Path, path: &Path) -> Result<(), WorktreeError> {
        if let Err(error) = self.git.worktree_remove(repo, path) {
            tracing::debug!(path = %path.display(), %error, "worktree remove failed, deleting directory");
            if path.exists() {
                std::fs::remove_dir_all(path).map_err(|e| WorktreeError::Cleanup {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }
        if let Err(error) = self.git.worktree_prune(repo) {
            tracing::debug!(repo = %repo.display(), %error, "worktree prune failed");
        }
        Ok(())
    }
}

/// Shared clone a worktree was created from, read from its `.git` file
/// (`gitdir: <repo>/.git/worktrees/<name>`).
pub fn owning_repository(worktree: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(worktree.join(".git")).ok()?;
    let gitdir = contents.trim().strip_prefix("gitdir:")?.trim();
    let gitdir = PathBuf::from(gitdir);
    // <repo>/.git/worktrees/<name> → <repo>
    gitdir.parent()?.parent()?.parent().map(Path::to_path_buf)
}
