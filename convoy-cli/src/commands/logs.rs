//! `convoy logs` — tail the logs of the latest run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use convoy_core::paths::{logs_dir, task_log_path, LOG_EXTENSION};
use convoy_core::Bundle;
use convoy_runner::paths::latest_run_dir;
use convoy_runner::RunSummary;

use super::absolute_root;

/// Arguments for `convoy logs`.
#[derive(Args, Debug)]
pub struct LogsArgs {
    #[arg(long)]
    pub bundle: PathBuf,

    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Show only this task's log.
    #[arg(long)]
    pub task: Option<String>,

    /// Number of trailing lines per log.
    #[arg(long, default_value_t = 20)]
    pub lines: usize,
}

impl LogsArgs {
    pub fn run(self) -> Result<()> {
        let bundle = Bundle::open(&self.bundle)
            .with_context(|| format!("cannot open bundle '{}'", self.bundle.display()))?;
        let root = absolute_root(&self.root)?;
        let logs = logs_dir(&root, &bundle.name);
        let Some(run_dir) = latest_run_dir(&logs) else {
            bail!(
                "no saved logs for '{}' under {} (run with --save-logs or --parallel)",
                bundle.name,
                logs.display()
            );
        };

        if let Some(task) = &self.task {
            let path = task_log_path(&run_dir, task);
            if !path.is_file() {
                bail!("no log for task '{task}' in {}", run_dir.display());
            }
            print!("{}", tail(&path, self.lines)?);
            return Ok(());
        }

        println!("Run: {}", run_dir.display());
        if let Ok(summary) = RunSummary::load_json(&run_dir) {
            println!(
                "{} succeeded, {} failed, {} total",
                summary.successful, summary.failed, summary.total
            );
        }
        for path in log_files(&run_dir)? {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("{}", format!("==> {name} <==").bold());
            print!("{}", tail(&path, self.lines)?);
        }
        Ok(())
    }
}

fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

/// Last `n` lines of `path`, newline-terminated.
fn tail(path: &Path, n: usize) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = lines[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tail_keeps_last_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, "1\n2\n3\n4\n").unwrap();
        assert_eq!(tail(&path, 2).unwrap(), "3\n4\n");
        assert_eq!(tail(&path, 10).unwrap(), "1\n2\n3\n4\n");
        assert_eq!(tail(&path, 0).unwrap(), "");
    }
}
