//! Convoy core library — domain types, target expansion, layered config,
//! bundle loading and the on-disk layout.
//!
//! - [`types`] — newtypes, [`Job`], [`AgentKind`]
//! - [`target`] — [`TargetSpec`] parsing and [`expand`]
//! - [`config`] — [`ConfigLayer`] / [`Config`]
//! - [`bundle`] — [`Bundle`]
//! - [`paths`] — root directory layout
//! - [`error`] — [`ConfigError`]

pub mod bundle;
pub mod config;
pub mod error;
pub mod paths;
pub mod target;
pub mod types;

pub use bundle::Bundle;
pub use config::{Config, ConfigLayer};
pub use error::ConfigError;
pub use target::{expand, Expansion, TargetEntry, TargetSpec};
pub use types::{upstream_url, AgentKind, BranchName, Job, OrgName, RepoName};
