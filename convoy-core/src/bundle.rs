//! Bundles: a directory holding one reusable automation scenario.
//!
//! ```text
//! <bundle>/
//!   target.yaml   (or target.yml)   required
//!   task.md       (or task.txt)     required
//!   guide.md                        optional
//!   config.json                     optional
//! ```

use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLayer};
use crate::error::{io_err, ConfigError};
use crate::paths::{root_config_path, root_guide_path};
use crate::target::TargetSpec;

const TARGET_FILES: &[&str] = &["target.yaml", "target.yml"];
const TASK_FILES: &[&str] = &["task.md", "task.txt"];
const GUIDE_FILE: &str = "guide.md";
const BUNDLE_CONFIG: &str = "config.json";

/// A bundle directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Directory name; used to namespace tasks, worktrees and logs.
    pub name: String,
    pub dir: PathBuf,
}

impl Bundle {
    /// Open an existing bundle directory.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_dir() {
            return Err(ConfigError::MissingFile {
                what: "bundle directory",
                path: path.to_path_buf(),
            });
        }
        let dir = path.canonicalize().map_err(|e| io_err(path, e))?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        Ok(Bundle { name, dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(BUNDLE_CONFIG)
    }

    pub fn target_path(&self) -> Result<PathBuf, ConfigError> {
        first_existing(&self.dir, TARGET_FILES, "target specification")
    }

    pub fn task_path(&self) -> Result<PathBuf, ConfigError> {
        first_existing(&self.dir, TASK_FILES, "task description")
    }

    pub fn load_targets(&self) -> Result<TargetSpec, ConfigError> {
        TargetSpec::load(&self.target_path()?)
    }

    pub fn load_task(&self) -> Result<String, ConfigError> {
        let path = self.task_path()?;
        std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))
    }

    /// Locate the workflow guide.
    ///
    /// Order: explicit `guide_file` (relative paths tried against the bundle,
    /// then the root) → `<bundle>/guide.md` → `<root>/guide.md`.
    pub fn resolve_guide(
        &self,
        root: &Path,
        guide_file: Option<&Path>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(explicit) = guide_file {
            let candidates = if explicit.is_absolute() {
                vec![explicit.to_path_buf()]
            } else {
                vec![self.dir.join(explicit), root.join(explicit)]
            };
            return candidates
                .into_iter()
                .find(|p| p.is_file())
                .ok_or_else(|| ConfigError::MissingFile {
                    what: "guide file",
                    path: explicit.to_path_buf(),
                });
        }

        [self.dir.join(GUIDE_FILE), root_guide_path(root)]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::MissingFile {
                what: "guide file",
                path: self.dir.join(GUIDE_FILE),
            })
    }

    pub fn load_guide(&self, root: &Path, guide_file: Option<&Path>) -> Result<String, ConfigError> {
        let path = self.resolve_guide(root, guide_file)?;
        std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))
    }

    /// Resolve the effective config: defaults < root < bundle < `cli`.
    pub fn resolve_config(&self, root: &Path, cli: ConfigLayer) -> Result<Config, ConfigError> {
        let root_layer = ConfigLayer::load(&root_config_path(root))?;
        let bundle_layer = ConfigLayer::load(&self.config_path())?;
        Config::resolve([root_layer, bundle_layer, cli])
    }
}

fn first_existing(
    dir: &Path,
    names: &[&str],
    what: &'static str,
) -> Result<PathBuf, ConfigError> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::MissingFile {
            what,
            path: dir.join(names[0]),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
