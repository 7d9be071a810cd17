use std::path::PathBuf;

use thiserror::Error;

/// Setup failures of a run. Failing tasks are never errors; they become
/// failed [`crate::TaskResult`]s.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunnerError {
    RunnerError::Io {
        path: path.into(),
        source,
    }
}
