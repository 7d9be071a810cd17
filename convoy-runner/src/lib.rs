//! Task execution: agent processes, lane scheduling, result aggregation.

pub mod agent;
mod error;
pub mod executor;
pub mod paths;
mod runtime;
pub mod scheduler;
pub mod summary;

pub use agent::{AgentInvocation, AgentOutcome, AgentRunner, ProcessAgent};
pub use error::RunnerError;
pub use executor::{execute, TaskResult};
pub use runtime::{run, start_blocking, RunRequest};
pub use scheduler::{LaneKey, RunOptions, Scheduler};
pub use summary::RunSummary;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`, or `debug`
/// when `verbose`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
