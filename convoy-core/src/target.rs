//! Target specification parsing and expansion into [`Job`]s.
//!
//! Two YAML shapes are accepted:
//!
//! ```yaml
//! # grouped form
//! target:
//!   - org: acme
//!     repos: [svc, web]
//!     branches: [main, dev]
//!
//! # legacy form
//! target:
//!   - repo: acme/svc
//!     branch: main
//! ```
//!
//! A bare top-level list of either kind is accepted as well.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{io_err, ConfigError};
use crate::types::Job;

/// One declared entry. Empty fields mean "missing" and make the entry
/// invalid at expansion time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetEntry {
    pub org: String,
    pub repos: Vec<String>,
    pub branches: Vec<String>,
}

/// Ordered list of target entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetSpec {
    pub entries: Vec<TargetEntry>,
}

/// Result of [`expand`]: the jobs plus one warning per skipped entry.
#[derive(Debug, Default)]
pub struct Expansion {
    pub jobs: Vec<Job>,
    pub warnings: Vec<ConfigError>,
}

impl TargetSpec {
    /// Read and parse a target file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile {
                what: "target specification",
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::parse(&contents).map_err(|reason| ConfigError::TargetSpec {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse YAML text in either accepted shape.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let root: Value = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        let items = match &root {
            Value::Sequence(items) => items,
            Value::Mapping(map) => match map_get(map, "target").or_else(|| map_get(map, "targets")) {
                Some(Value::Sequence(items)) => items,
                Some(_) => return Err("`target` must be a list".to_string()),
                None => return Err("missing top-level `target` list".to_string()),
            },
            _ => return Err("expected a mapping with a `target` list".to_string()),
        };

        let entries = items.iter().map(parse_entry).collect();
        Ok(TargetSpec { entries })
    }
}

/// Expand entries into jobs: entry order, then repo order, then branch order.
///
/// Malformed entries are skipped with a warning; they never abort expansion.
pub fn expand(spec: &TargetSpec) -> Expansion {
    let mut expansion = Expansion::default();
    for (index, entry) in spec.entries.iter().enumerate() {
        if let Some(reason) = entry_problem(entry) {
            tracing::warn!(entry = index, %reason, "skipping target entry");
            expansion
                .warnings
                .push(ConfigError::InvalidEntry { index, reason });
            continue;
        }
        for repo in &entry.repos {
            for branch in &entry.branches {
                expansion
                    .jobs
                    .push(Job::new(entry.org.as_str(), repo.as_str(), branch.as_str()));
            }
        }
    }
    expansion
}

fn entry_problem(entry: &TargetEntry) -> Option<String> {
    let mut missing = Vec::new();
    if entry.org.trim().is_empty() {
        missing.push("org");
    }
    if entry.repos.is_empty() {
        missing.push("repos");
    }
    if entry.branches.is_empty() {
        missing.push("branches");
    }
    if missing.is_empty() {
        None
    } else {
        Some(format!("missing or empty {}", missing.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// Tolerant entry parsing
// ---------------------------------------------------------------------------

fn parse_entry(item: &Value) -> TargetEntry {
    let Value::Mapping(map) = item else {
        return TargetEntry::default();
    };

    let org = map_get(map, "org").and_then(scalar).unwrap_or_default();

    // Legacy `{repo, branch}` pair, where repo may be `org/repo`.
    if let Some(repo) = map_get(map, "repo").and_then(scalar) {
        let (org, repo) = match repo.split_once('/') {
            Some((owner, name)) if org.is_empty() => (owner.to_string(), name.to_string()),
            _ => (org, repo),
        };
        let branches = map_get(map, "branch")
            .or_else(|| map_get(map, "branches"))
            .map(string_list)
            .unwrap_or_default();
        return TargetEntry {
            org,
            repos: non_empty(vec![repo]),
            branches,
        };
    }

    TargetEntry {
        org,
        repos: map_get(map, "repos").map(string_list).unwrap_or_default(),
        branches: map_get(map, "branches").map(string_list).unwrap_or_default(),
    }
}

fn map_get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(Value::String(key.to_string()))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => non_empty(items.iter().filter_map(scalar).collect()),
        other => non_empty(scalar(other).into_iter().collect()),
    }
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter(|s| !s.is_empty()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
