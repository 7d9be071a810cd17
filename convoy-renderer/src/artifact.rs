//! Reading task documents back.
//!
//! Only the header section (everything before `## Guide`) is scanned for the
//! `- **Field**: value` lines, so guide or task text that happens to contain
//! the same markup cannot shadow the real metadata.

use std::path::{Path, PathBuf};

use convoy_core::Job;

use crate::error::RenderError;

const GUIDE_HEADING: &str = "## Guide";

/// Metadata recovered from a rendered task document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub task_id: String,
    /// Leading counter of the file stem; `None` for hand-named documents.
    pub sequence: Option<usize>,
    pub job: Job,
    pub workspace_path: PathBuf,
}

/// Parse the task document at `path`.
pub fn parse_artifact(path: &Path) -> Result<ParsedDocument, RenderError> {
    let content = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let task_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_document(&task_id, &content).map_err(|field| RenderError::MissingField {
        path: path.to_path_buf(),
        field,
    })
}

/// Parse document text. Returns the name of the first missing field on error.
pub fn parse_document(task_id: &str, content: &str) -> Result<ParsedDocument, &'static str> {
    let header = content
        .split_once(GUIDE_HEADING)
        .map(|(head, _)| head)
        .unwrap_or(content);

    let org = field(header, "Organization").ok_or("Organization")?;
    let repo = field(header, "Repository").ok_or("Repository")?;
    let branch = field(header, "Branch").ok_or("Branch")?;
    let workspace = field(header, "Workspace Path").ok_or("Workspace Path")?;

    Ok(ParsedDocument {
        task_id: task_id.to_string(),
        sequence: sequence_of(task_id),
        job: Job::new(org, repo, branch),
        workspace_path: PathBuf::from(workspace),
    })
}

/// Leading decimal counter of a task id (`007_svc_main` → 7).
pub fn sequence_of(task_id: &str) -> Option<usize> {
    let digits: String = task_id.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn field(header: &str, name: &str) -> Option<String> {
    let needle = format!("**{name}**:");
    header.lines().find_map(|line| {
        let line = line.trim();
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line)
            .trim_start();
        let rest = line.strip_prefix(&needle)?;
        let value = rest.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
