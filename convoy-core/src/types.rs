//! Domain types shared by every Convoy crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Account or organization owning the canonical upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgName(pub String);

impl fmt::Display for OrgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OrgName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrgName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Repository name without its owner (`svc`, not `acme/svc`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Git branch name, possibly containing slashes (`feature/login`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    /// Branch name made safe for use as a single path component.
    ///
    /// Separators and characters rejected by common filesystems become `-`.
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c if c.is_whitespace() || c.is_control() => '-',
                c => c,
            })
            .collect()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One concrete unit of work: run the task against `org/repo` at `branch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub org: OrgName,
    pub repo: RepoName,
    pub branch: BranchName,
}

impl Job {
    pub fn new(
        org: impl Into<OrgName>,
        repo: impl Into<RepoName>,
        branch: impl Into<BranchName>,
    ) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// Canonical upstream clone URL for this job's repository.
    pub fn upstream_url(&self) -> String {
        upstream_url(&self.org, &self.repo)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.org, self.repo, self.branch)
    }
}

/// `https://github.com/{org}/{repo}.git`
pub fn upstream_url(org: &OrgName, repo: &RepoName) -> String {
    format!("https://github.com/{}/{}.git", org.0, repo.0)
}

// ---------------------------------------------------------------------------
// Agent selection
// ---------------------------------------------------------------------------

/// External AI coding-agent CLI that performs the actual edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Claude,
    Gemini,
    Codex,
}

impl AgentKind {
    /// All agent variants in a stable order.
    pub fn all() -> &'static [AgentKind] {
        &[AgentKind::Claude, AgentKind::Gemini, AgentKind::Codex]
    }

    /// Executable looked up on `PATH`.
    pub fn program(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Gemini => "gemini",
            AgentKind::Codex => "codex",
        }
    }

    /// Non-interactive arguments; the task document arrives on stdin.
    pub fn default_args(&self) -> &'static [&'static str] {
        match self {
            AgentKind::Claude => &["-p", "--dangerously-skip-permissions"],
            AgentKind::Gemini => &["--yolo"],
            AgentKind::Codex => &["exec", "--full-auto", "-"],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(AgentKind::Claude),
            "gemini" => Ok(AgentKind::Gemini),
            "codex" => Ok(AgentKind::Codex),
            other => {
                let expected: Vec<&str> = AgentKind::all().iter().map(AgentKind::program).collect();
                Err(format!("unknown agent '{other}'; expected: {}", expected.join(", ")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
