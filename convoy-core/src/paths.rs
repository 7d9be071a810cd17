//! On-disk layout under the Convoy root directory.
//!
//! ```text
//! <root>/
//!   config.json                       root config layer (optional)
//!   guide.md                          fallback workflow guide (optional)
//!   templates/task.md.tera            task document override (optional)
//!   workspace/<repo>/                 shared clones, persisted across runs
//!   worktrees/<bundle>/<task_id>/     worktree mode only
//!   tasks/<bundle>/<task_id>.md       generated task documents
//!   logs/<bundle>/<run_stamp>/        per-task logs + summary.json
//! ```

use std::path::{Path, PathBuf};

pub const ROOT_CONFIG: &str = "config.json";
pub const ROOT_GUIDE: &str = "guide.md";
pub const TASK_EXTENSION: &str = "md";
pub const LOG_EXTENSION: &str = "log";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn root_config_path(root: &Path) -> PathBuf {
    root.join(ROOT_CONFIG)
}

pub fn root_guide_path(root: &Path) -> PathBuf {
    root.join(ROOT_GUIDE)
}

pub fn templates_dir(root: &Path) -> PathBuf {
    root.join("templates")
}

pub fn workspace_dir(root: &Path) -> PathBuf {
    root.join("workspace")
}

pub fn worktrees_dir(root: &Path, bundle: &str) -> PathBuf {
    root.join("worktrees").join(bundle)
}

pub fn tasks_dir(root: &Path, bundle: &str) -> PathBuf {
    root.join("tasks").join(bundle)
}

pub fn logs_dir(root: &Path, bundle: &str) -> PathBuf {
    root.join("logs").join(bundle)
}

pub fn run_logs_dir(root: &Path, bundle: &str, run_stamp: &str) -> PathBuf {
    logs_dir(root, bundle).join(run_stamp)
}

/// `<tasks_dir>/<task_id>.md`
pub fn task_document_path(tasks_dir: &Path, task_id: &str) -> PathBuf {
    tasks_dir.join(format!("{task_id}.{TASK_EXTENSION}"))
}

/// `<logs_dir>/<task_id>.log`
pub fn task_log_path(run_logs_dir: &Path, task_id: &str) -> PathBuf {
    run_logs_dir.join(format!("{task_id}.{LOG_EXTENSION}"))
}
