//! Layered run configuration.
//!
//! Layers are merged in increasing priority:
//!
//! ```text
//! built-in defaults  <  <root>/config.json  <  <bundle>/config.json  <  CLI flags
//! ```
//!
//! Merge contract: [`ConfigLayer::overlay`] is last-writer-wins per key. A key
//! set in a later layer replaces the earlier value wholesale (lists are not
//! concatenated); a key absent from a later layer falls through unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::AgentKind;

/// Default global concurrency cap for parallel mode.
pub const DEFAULT_MAX_JOBS: usize = 4;

/// One partial configuration layer. Every key is optional; unknown JSON keys
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_jobs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_logs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shallow_clone: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<i64>,
}

impl ConfigLayer {
    /// Load a JSON layer. A missing file yields an empty layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents).map_err(|source| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `other` on top of `self`: every key set in `other` wins.
    pub fn overlay(mut self, other: ConfigLayer) -> Self {
        fn pick<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        pick(&mut self.parallel, other.parallel);
        pick(&mut self.max_jobs, other.max_jobs);
        pick(&mut self.save_logs, other.save_logs);
        pick(&mut self.generate_only, other.generate_only);
        pick(&mut self.run_only, other.run_only);
        pick(&mut self.guide_file, other.guide_file);
        pick(&mut self.shallow_clone, other.shallow_clone);
        pick(&mut self.worktree, other.worktree);
        pick(&mut self.agent, other.agent);
        pick(&mut self.agent_args, other.agent_args);
        pick(&mut self.task_timeout_secs, other.task_timeout_secs);
        self
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub parallel: bool,
    pub max_jobs: usize,
    pub save_logs: bool,
    pub generate_only: bool,
    pub run_only: bool,
    pub guide_file: Option<PathBuf>,
    pub shallow_clone: bool,
    pub worktree: bool,
    pub agent: AgentKind,
    pub agent_args: Option<Vec<String>>,
    pub task_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel: false,
            max_jobs: DEFAULT_MAX_JOBS,
            save_logs: false,
            generate_only: false,
            run_only: false,
            guide_file: None,
            shallow_clone: false,
            worktree: false,
            agent: AgentKind::default(),
            agent_args: None,
            task_timeout: None,
        }
    }
}

impl Config {
    /// Merge `layers` (lowest priority first) over the built-in defaults and
    /// validate the result.
    pub fn resolve<I>(layers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let merged = layers
            .into_iter()
            .fold(ConfigLayer::default(), ConfigLayer::overlay);
        let defaults = Config::default();

        let generate_only = merged.generate_only.unwrap_or(defaults.generate_only);
        let run_only = merged.run_only.unwrap_or(defaults.run_only);
        if generate_only && run_only {
            return Err(ConfigError::ConflictingModes);
        }

        let max_jobs = match merged.max_jobs {
            None => defaults.max_jobs,
            Some(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
            Some(n) => {
                return Err(ConfigError::InvalidValue {
                    key: "maxJobs",
                    reason: format!("must be a positive integer, got {n}"),
                })
            }
        };

        let task_timeout = match merged.task_timeout_secs {
            None => None,
            Some(n) if n >= 1 => Some(Duration::from_secs(n as u64)),
            Some(n) => {
                return Err(ConfigError::InvalidValue {
                    key: "taskTimeoutSecs",
                    reason: format!("must be a positive integer, got {n}"),
                })
            }
        };

        let parallel = merged.parallel.unwrap_or(defaults.parallel);
        // Interleaved console output from concurrent agents is unreadable.
        let save_logs = parallel || merged.save_logs.unwrap_or(defaults.save_logs);

        Ok(Config {
            parallel,
            max_jobs,
            save_logs,
            generate_only,
            run_only,
            guide_file: merged.guide_file,
            shallow_clone: merged.shallow_clone.unwrap_or(defaults.shallow_clone),
            worktree: merged.worktree.unwrap_or(defaults.worktree),
            agent: merged.agent.unwrap_or(defaults.agent),
            agent_args: merged.agent_args,
            task_timeout,
        })
    }

    /// Program and argument vector for the configured agent.
    pub fn agent_command(&self) -> (String, Vec<String>) {
        let args = match &self.agent_args {
            Some(args) => args.clone(),
            None => self
                .agent
                .default_args()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        (self.agent.program().to_string(), args)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
