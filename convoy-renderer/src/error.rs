//! Error types for convoy-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from rendering or parsing task documents.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Filesystem error while loading user templates or task documents.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// A task document lacks one of the repository information fields.
    #[error("task document {path} is missing the '{field}' field")]
    MissingField { path: PathBuf, field: &'static str },
}
