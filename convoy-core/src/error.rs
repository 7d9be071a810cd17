//! Error types for convoy-core.

use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Every variant aborts a run before any provisioning or
/// execution begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input file or directory is absent.
    #[error("{what} not found at {path}")]
    MissingFile { what: &'static str, path: PathBuf },

    /// Target specification could not be parsed at all.
    #[error("invalid target specification at {path}: {reason}")]
    TargetSpec { path: PathBuf, reason: String },

    /// A single target entry is malformed. Reported as a warning by the
    /// expander; the remaining entries are still processed.
    #[error("target entry #{index} skipped: {reason}")]
    InvalidEntry { index: usize, reason: String },

    /// JSON config layer failed to parse.
    #[error("failed to parse config at {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `--generate-only` and `--run-only` were both requested.
    #[error("--generate-only and --run-only are mutually exclusive")]
    ConflictingModes,

    /// Out-of-range option value after merging all layers.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
