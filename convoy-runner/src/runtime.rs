use std::sync::Arc;

use tokio::sync::watch;

use convoy_workspace::TaskArtifact;

use crate::agent::AgentRunner;
use crate::error::{io_err, RunnerError};
use crate::executor::TaskResult;
use crate::scheduler::{RunOptions, Scheduler};
use crate::summary::RunSummary;

/// One execution phase.
pub struct RunRequest {
    pub agent: Arc<dyn AgentRunner>,
    pub artifacts: Vec<TaskArtifact>,
    /// Jobs dropped during generation; counted as failed.
    pub skipped: Vec<TaskResult>,
    pub options: RunOptions,
}

/// Build a multi-threaded runtime and block on [`run`].
pub fn start_blocking(request: RunRequest) -> Result<RunSummary, RunnerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(request))
}

/// Execute every artifact, then aggregate. Ctrl-C cancels running agents and
/// marks the remaining tasks as not run. `summary.json` is written next to the
/// task logs when logs are saved.
pub async fn run(request: RunRequest) -> Result<RunSummary, RunnerError> {
    let RunRequest {
        agent,
        artifacts,
        skipped,
        options,
    } = request;

    if let Some(dir) = &options.log_dir {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("received ctrl-c, cancelling running tasks");
                let _ = cancel_tx.send(true);
                // Keep the sender alive so receivers observe the flag.
                std::future::pending::<()>().await;
            }
            Err(err) => tracing::warn!(error = %err, "ctrl-c handler unavailable"),
        }
    });

    let mut results = Scheduler::new(agent, cancel_rx).run(artifacts, &options).await;
    signal_handle.abort();
    results.extend(skipped);

    let summary = RunSummary::from_results(&results);
    if let Some(dir) = &options.log_dir {
        let path = summary.write_json(dir)?;
        tracing::debug!(path = %path.display(), "summary written");
    }
    tracing::info!(
        successful = summary.successful,
        failed = summary.failed,
        total = summary.total,
        "run finished"
    );
    Ok(summary)
}
