//! `convoy clean` — remove generated task documents and worktrees.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use convoy_core::Bundle;
use convoy_workspace::{clean, SystemRunner};

use super::absolute_root;

/// Arguments for `convoy clean`.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Bundle whose generated files are removed.
    #[arg(long)]
    pub bundle: PathBuf,

    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Also remove the bundle's git worktrees.
    #[arg(long)]
    pub worktrees: bool,
}

impl CleanArgs {
    pub fn run(self) -> Result<()> {
        let bundle = Bundle::open(&self.bundle)
            .with_context(|| format!("cannot open bundle '{}'", self.bundle.display()))?;
        let root = absolute_root(&self.root)?;
        let report = clean(&SystemRunner, &root, &bundle.name, self.worktrees)
            .with_context(|| format!("clean failed for '{}'", bundle.name))?;

        if self.worktrees {
            println!(
                "✓ '{}' cleaned ({} task document(s), {} worktree(s) removed)",
                bundle.name, report.documents_removed, report.worktrees_removed
            );
        } else {
            println!(
                "✓ '{}' cleaned ({} task document(s) removed)",
                bundle.name, report.documents_removed
            );
        }
        Ok(())
    }
}
