//! # convoy-workspace
//!
//! Everything that touches git or the hosting CLI: forks and clones
//! ([`provision`]), worktrees ([`worktree`]), task document generation
//! ([`materialize`]) and the [`pipeline`] that ties them together.
//!
//! External programs are only ever run through [`CommandRunner`], so tests
//! substitute a scripted runner for `git` and `gh`.

pub mod command;
pub mod error;
pub mod git;
pub mod materialize;
pub mod pipeline;
pub mod provision;
pub mod worktree;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use error::{GitError, ProvisionFailure, ProvisionStep, WorkspaceError, WorktreeError};
pub use materialize::{task_id, Materializer, TaskArtifact, WorkspaceMode};
pub use pipeline::{
    clean, generate, load_artifacts, CleanReport, GenerateRequest, GenerationReport, SkippedJob,
};
pub use provision::{
    reconcile, ProvisionOptions, Provisioner, RemoteAction, RepositoryHandle, RepositoryState,
};
pub use worktree::WorktreeManager;
