pub mod clean;
pub mod logs;
pub mod run;
pub mod targets;

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// `root` as an absolute path without `.` components. Does not touch the
/// filesystem, so a missing root is fine.
pub fn absolute_root(root: &Path) -> Result<PathBuf> {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .context("could not determine current directory")?
            .join(root)
    };
    Ok(joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}
