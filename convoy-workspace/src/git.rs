//! Thin git and GitHub CLI wrappers over a [`CommandRunner`].

use std::collections::BTreeMap;
use std::path::Path;

use crate::command::{git_in, CommandOutput, CommandRunner, CommandSpec};
use crate::error::GitError;

/// Outcome of a wrapped call: trimmed stdout on success.
pub type CallResult = Result<String, GitError>;

fn failed(spec: &CommandSpec, out: &CommandOutput) -> GitError {
    GitError::Failed {
        command: spec.to_string(),
        message: out.failure_message(),
    }
}

fn spawn_failed(spec: &CommandSpec, err: std::io::Error) -> GitError {
    GitError::Spawn {
        command: spec.to_string(),
        message: err.to_string(),
    }
}

fn finish(spec: &CommandSpec, result: std::io::Result<CommandOutput>) -> CallResult {
    match result {
        Ok(out) if out.success() => Ok(out.stdout_trimmed().to_string()),
        Ok(out) => Err(failed(spec, &out)),
        Err(err) => Err(spawn_failed(spec, err)),
    }
}

// ---------------------------------------------------------------------------
// git
// ---------------------------------------------------------------------------

/// git operations used by provisioning and worktree management.
pub struct Git<'r, R: CommandRunner> {
    runner: &'r R,
}

impl<'r, R: CommandRunner> Git<'r, R> {
    pub fn new(runner: &'r R) -> Self {
        Git { runner }
    }

    fn call(&self, spec: CommandSpec) -> CallResult {
        finish(&spec, self.runner.run(&spec))
    }

    pub fn clone_repo(&self, url: &str, dest: &Path, shallow: bool) -> CallResult {
        let mut spec = CommandSpec::new("git").arg("clone");
        if shallow {
            spec = spec.args(["--depth", "1"]);
        }
        self.call(spec.arg(url).arg(dest.display().to_string()))
    }

    /// Remote name → fetch URL.
    pub fn remotes(&self, repo: &Path) -> Result<BTreeMap<String, String>, GitError> {
        let out = self.call(git_in(repo, &["remote", "-v"]))?;
        Ok(parse_remotes(&out))
    }

    pub fn remote_add(&self, repo: &Path, name: &str, url: &str) -> CallResult {
        self.call(git_in(repo, &["remote", "add", name, url]))
    }

    pub fn remote_set_url(&self, repo: &Path, name: &str, url: &str) -> CallResult {
        self.call(git_in(repo, &["remote", "set-url", name, url]))
    }

    /// Fetch one branch into `refs/remotes/<remote>/<branch>`. Works in
    /// shallow single-branch clones because the refspec is explicit.
    pub fn fetch_branch(&self, repo: &Path, remote: &str, branch: &str) -> CallResult {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.call(git_in(repo, &["fetch", remote, &refspec]))
    }

    /// `true` when `reference` names an existing ref.
    pub fn ref_exists(&self, repo: &Path, reference: &str) -> bool {
        self.call(git_in(repo, &["rev-parse", "--verify", "--quiet", reference]))
            .is_ok()
    }

    pub fn worktree_add(&self, repo: &Path, path: &Path, branch: &str) -> CallResult {
        let path = path.display().to_string();
        self.call(git_in(repo, &["worktree", "add", "--force", &path, branch]))
    }

    /// New local `branch` starting at `start_point`, checked out at `path`.
    pub fn worktree_add_tracking(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        start_point: &str,
    ) -> CallResult {
        let path = path.display().to_string();
        self.call(git_in(
            repo,
            &["worktree", "add", "--force", "-B", branch, &path, start_point],
        ))
    }

    pub fn worktree_remove(&self, repo: &Path, path: &Path) -> CallResult {
        let path = path.display().to_string();
        self.call(git_in(repo, &["worktree", "remove", "--force", &path]))
    }

    pub fn worktree_prune(&self, repo: &Path) -> CallResult {
        self.call(git_in(repo, &["worktree", "prune"]))
    }
}

/// Parse `git remote -v` output, keeping fetch URLs.
pub fn parse_remotes(output: &str) -> BTreeMap<String, String> {
    let mut remotes = BTreeMap::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        match parts.next() {
            Some("(push)") => {
                remotes.entry(name.to_string()).or_insert_with(|| url.to_string());
            }
            _ => {
                remotes.insert(name.to_string(), url.to_string());
            }
        }
    }
    remotes
}

// ---------------------------------------------------------------------------
// GitHub CLI
// ---------------------------------------------------------------------------

/// `gh` operations: who am I, does a fork exist, create a fork.
pub struct GitHubCli<'r, R: CommandRunner> {
    runner: &'r R,
}

impl<'r, R: CommandRunner> GitHubCli<'r, R> {
    pub fn new(runner: &'r R) -> Self {
        GitHubCli { runner }
    }

    fn call(&self, spec: CommandSpec) -> CallResult {
        finish(&spec, self.runner.run(&spec))
    }

    /// Login of the authenticated user.
    pub fn current_user(&self) -> CallResult {
        let spec = CommandSpec::new("gh").args(["api", "user", "--jq", ".login"]);
        let command = spec.to_string();
        let login = self.call(spec)?;
        if login.is_empty() {
            return Err(GitError::EmptyOutput { command });
        }
        Ok(login)
    }

    /// `Ok(true)` when `owner/repo` exists and is visible.
    pub fn repo_exists(&self, owner: &str, repo: &str) -> Result<bool, GitError> {
        let spec = CommandSpec::new("gh").args([
            "repo".to_string(),
            "view".to_string(),
            format!("{owner}/{repo}"),
            "--json".to_string(),
            "name".to_string(),
        ]);
        match self.runner.run(&spec) {
            Ok(out) if out.success() => Ok(true),
            Ok(out) if looks_like_not_found(&out) => Ok(false),
            Ok(out) => Err(failed(&spec, &out)),
            Err(err) => Err(spawn_failed(&spec, err)),
        }
    }

    /// Fork `org/repo` into the user's account without cloning it.
    pub fn fork(&self, org: &str, repo: &str) -> CallResult {
        self.call(CommandSpec::new("gh").args([
            "repo".to_string(),
            "fork".to_string(),
            format!("{org}/{repo}"),
            "--clone=false".to_string(),
        ]))
    }
}

fn looks_like_not_found(out: &CommandOutput) -> bool {
    let text = format!("{}\n{}", out.stdout, out.stderr).to_ascii_lowercase();
    text.contains("could not resolve to a repository") || text.contains("not found")
}
