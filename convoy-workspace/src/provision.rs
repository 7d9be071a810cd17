//! Repository provisioning: fork, clone and upstream reconciliation.
//!
//! Local state per repository name lives in a keyed store. The decision about
//! what to change on the `upstream` remote is the pure function
//! [`reconcile`]; [`Provisioner`] only gathers state and applies actions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use convoy_core::{upstream_url, OrgName, RepoName};

use crate::command::CommandRunner;
use crate::error::{GitError, ProvisionFailure, ProvisionStep};
use crate::git::{Git, GitHubCli};

/// Name of the remote pointing at the original repository.
pub const UPSTREAM_REMOTE: &str = "upstream";
/// Name of the remote pointing at the user's fork.
pub const ORIGIN_REMOTE: &str = "origin";

// ---------------------------------------------------------------------------
// State and reconciliation
// ---------------------------------------------------------------------------

/// Observed local state of one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
    pub exists: bool,
    /// Remote name → fetch URL.
    pub remotes: BTreeMap<String, String>,
}

impl RepositoryState {
    pub fn origin(&self) -> Option<&str> {
        self.remotes.get(ORIGIN_REMOTE).map(String::as_str)
    }

    pub fn upstream(&self) -> Option<&str> {
        self.remotes.get(UPSTREAM_REMOTE).map(String::as_str)
    }
}

/// A change to apply to a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    Add { name: String, url: String },
    SetUrl { name: String, url: String },
}

/// Actions that bring `state`'s `upstream` remote to `https://github.com/{org}/{repo}.git`.
///
/// Empty when the remote already matches, so applying the result twice never
/// duplicates a remote.
pub fn reconcile(state: &RepositoryState, org: &OrgName, repo: &RepoName) -> Vec<RemoteAction> {
    let wanted = upstream_url(org, repo);
    match state.upstream() {
        Some(url) if same_remote_url(url, &wanted) => vec![],
        Some(_) => vec![RemoteAction::SetUrl {
            name: UPSTREAM_REMOTE.to_string(),
            url: wanted,
        }],
        None => vec![RemoteAction::Add {
            name: UPSTREAM_REMOTE.to_string(),
            url: wanted,
        }],
    }
}

/// URL equality ignoring a trailing `.git` and `/`.
fn same_remote_url(a: &str, b: &str) -> bool {
    fn norm(s: &str) -> &str {
        let s = s.trim().trim_end_matches('/');
        s.strip_suffix(".git").unwrap_or(s)
    }
    norm(a) == norm(b)
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Clone with `--depth 1`.
    pub shallow: bool,
}

/// A provisioned local working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub repo: RepoName,
    pub path: PathBuf,
    /// `true` when this call cloned the repository.
    pub cloned: bool,
}

/// Ensures forks and clones exist, one repository at a time.
pub struct Provisioner<'r, R: CommandRunner> {
    runner: &'r R,
    states: BTreeMap<RepoName, RepositoryState>,
    login: Option<String>,
}

impl<'r, R: CommandRunner> Provisioner<'r, R> {
    pub fn new(runner: &'r R) -> Self {
        Provisioner {
            runner,
            states: BTreeMap::new(),
            login: None,
        }
    }

    /// Last observed state of `repo`, after reconciliation.
    pub fn state(&self, repo: &RepoName) -> Option<&RepositoryState> {
        self.states.get(repo)
    }

    /// Make sure `workspace_root/repo` is a clone of the user's fork with an
    /// `upstream` remote pointing at `org/repo`.
    pub fn ensure_repository(
        &mut self,
        org: &OrgName,
        repo: &RepoName,
        workspace_root: &Path,
        opts: ProvisionOptions,
    ) -> Result<RepositoryHandle, ProvisionFailure> {
        let fail = |step: ProvisionStep, message: String| ProvisionFailure {
            repo: repo.clone(),
            step,
            message,
        };
        let git = Git::new(self.runner);
        let path = workspace_root.join(&repo.0);

        let mut cloned = false;
        if path.is_dir() {
            tracing::debug!(repo = %repo, path = %path.display(), "existing clone");
        } else {
            let login = self.resolve_login().map_err(|e| fail(ProvisionStep::ResolveIdentity, e.to_string()))?;
            let gh = GitHubCli::new(self.runner);
            let has_fork = gh
                .repo_exists(&login, &repo.0)
                .map_err(|e| fail(ProvisionStep::CheckFork, e.to_string()))?;
            if !has_fork {
                tracing::info!(org = %org, repo = %repo, "creating fork");
                gh.fork(&org.0, &repo.0)
                    .map_err(|e| fail(ProvisionStep::CreateFork, e.to_string()))?;
            }

            std::fs::create_dir_all(workspace_root).map_err(|e| {
                fail(ProvisionStep::Clone, format!("{}: {e}", workspace_root.display()))
            })?;
            let fork_url = format!("https://github.com/{login}/{repo}.git");
            tracing::info!(repo = %repo, url = %fork_url, shallow = opts.shallow, "cloning");
            if let Err(err) = git.clone_repo(&fork_url, &path, opts.shallow) {
                if path.exists() {
                    if let Err(e) = std::fs::remove_dir_all(&path) {
                        tracing::warn!(path = %path.display(), error = %e, "could not remove partial clone");
                    }
                }
                return Err(fail(ProvisionStep::Clone, err.to_string()));
            }
            cloned = true;
        }

        let remotes = git
            .remotes(&path)
            .map_err(|e| fail(ProvisionStep::InspectRemotes, e.to_string()))?;
        let mut state = RepositoryState {
            exists: true,
            remotes,
        };
        for action in reconcile(&state, org, repo) {
            let result = match &action {
                RemoteAction::Add { name, url } => {
                    tracing::info!(repo = %repo, url = %url, "adding upstream remote");
                    git.remote_add(&path, name, url)
                }
                RemoteAction::SetUrl { name, url } => {
                    tracing::info!(repo = %repo, url = %url, "updating stale upstream remote");
                    git.remote_set_url(&path, name, url)
                }
            };
            result.map_err(|e| fail(ProvisionStep::ConfigureUpstream, e.to_string()))?;
            let (RemoteAction::Add { name, url } | RemoteAction::SetUrl { name, url }) = action;
            state.remotes.insert(name, url);
        }
        self.states.insert(repo.clone(), state);

        Ok(RepositoryHandle {
            repo: repo.clone(),
            path,
            cloned,
        })
    }

    fn resolve_login(&mut self) -> Result<String, GitError> {
        if let Some(login) = &self.login {
            return Ok(login.clone());
        }
        let login = GitHubCli::new(self.runner).current_user()?;
        self.login = Some(login.clone());
        Ok(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn state_with_upstream(url: Option<&str>) -> RepositoryState {
        let mut remotes = BTreeMap::new();
        remotes.insert("origin".to_string(), "https://github.com/me/svc.git".to_string());
        if let Some(url) = url {
            remotes.insert("upstream".to_string(), url.to_string());
        }
        RepositoryState {
            exists: true,
            remotes,
        }
    }

    #[rstest]
    #[case(Some("https://github.com/acme/svc.git"), 0)]
    #[case(Some("https://github.com/acme/svc"), 0)]
    #[case(Some("https://github.com/acme/svc/"), 0)]
    fn matching_upstream_needs_nothing(#[case] url: Option<&str>, #[case] expected: usize) {
        let actions = reconcile(&state_with_upstream(url), &"acme".into(), &"svc".into());
        assert_eq!(actions.len(), expected);
    }

    #[test]
    fn missing_upstream_is_added() {
        let actions = reconcile(&state_with_upstream(None), &"acme".into(), &"svc".into());
        assert_eq!(
            actions,
            vec![RemoteAction::Add {
                name: "upstream".into(),
                url: "https://github.com/acme/svc.git".into()
            }]
        );
    }

    #[test]
    fn stale_upstream_is_repointed() {
        let state = state_with_upstream(Some("https://github.com/old-org/svc.git"));
        let actions = reconcile(&state, &"acme".into(), &"svc".into());
        assert_eq!(
            actions,
            vec![RemoteAction::SetUrl {
                name: "upstream".into(),
                url: "https://github.com/acme/svc.git".into()
            }]
        );
    }
}
