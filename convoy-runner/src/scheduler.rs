//! Sequential and lane-parallel scheduling of task artifacts.
//!
//! In parallel mode artifacts are partitioned into lanes. A lane runs its
//! artifacts one after another in generation order; at most `max_jobs` lanes
//! run at once. Two tasks of the same lane therefore never overlap, which
//! keeps agents from racing on a shared working directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use convoy_workspace::TaskArtifact;

use crate::agent::AgentRunner;
use crate::executor::{execute, TaskResult};

/// What groups artifacts into a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneKey {
    /// Repository name of the artifact's job (shared clones).
    #[default]
    Repository,
    /// The artifact's workspace path (one worktree per task).
    WorkspacePath,
}

impl LaneKey {
    fn of(&self, artifact: &TaskArtifact) -> String {
        match self {
            LaneKey::Repository => artifact.job.repo.0.clone(),
            LaneKey::WorkspacePath => artifact.workspace_path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub parallel: bool,
    pub max_jobs: usize,
    pub lane_key: LaneKey,
    /// Per-task logs are written here when set.
    pub log_dir: Option<PathBuf>,
    pub task_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            parallel: false,
            max_jobs: convoy_core::config::DEFAULT_MAX_JOBS,
            lane_key: LaneKey::Repository,
            log_dir: None,
            task_timeout: None,
        }
    }
}

/// Artifacts sharing one lane key, in generation order. Each carries its
/// position in the overall run.
#[derive(Debug, Clone)]
pub struct Lane {
    pub key: String,
    pub tasks: Vec<(usize, TaskArtifact)>,
}

/// Sort by (sequence, task id).
pub fn generation_order(artifacts: &mut [TaskArtifact]) {
    artifacts.sort_by(|a, b| (a.sequence, &a.task_id).cmp(&(b.sequence, &b.task_id)));
}

/// Partition already-ordered artifacts into lanes, lanes in order of first
/// appearance.
pub fn partition(artifacts: Vec<TaskArtifact>, key: LaneKey) -> Vec<Lane> {
    let mut lanes: Vec<Lane> = Vec::new();
    for (index, artifact) in artifacts.into_iter().enumerate() {
        let k = key.of(&artifact);
        match lanes.iter_mut().find(|lane| lane.key == k) {
            Some(lane) => lane.tasks.push((index, artifact)),
            None => lanes.push(Lane {
                key: k,
                tasks: vec![(index, artifact)],
            }),
        }
    }
    lanes
}

/// Runs artifacts through an [`AgentRunner`].
pub struct Scheduler {
    agent: Arc<dyn AgentRunner>,
    cancel: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(agent: Arc<dyn AgentRunner>, cancel: watch::Receiver<bool>) -> Self {
        Scheduler { agent, cancel }
    }

    /// Run every artifact once. Results come back in generation order.
    pub async fn run(&self, mut artifacts: Vec<TaskArtifact>, opts: &RunOptions) -> Vec<TaskResult> {
        generation_order(&mut artifacts);
        if opts.parallel {
            self.run_parallel(artifacts, opts).await
        } else {
            self.run_sequential(artifacts, opts).await
        }
    }

    async fn run_sequential(&self, artifacts: Vec<TaskArtifact>, opts: &RunOptions) -> Vec<TaskResult> {
        tracing::info!(tasks = artifacts.len(), "running sequentially");
        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            results.push(execute(self.agent.as_ref(), artifact, opts, self.cancel.clone()).await);
        }
        results
    }

    async fn run_parallel(&self, artifacts: Vec<TaskArtifact>, opts: &RunOptions) -> Vec<TaskResult> {
        let total = artifacts.len();
        let placeholders: Vec<TaskResult> = artifacts
            .iter()
            .map(|a| TaskResult::not_run(&a.task_id, a.job.clone(), "lane aborted before the task ran"))
            .collect();
        let lanes = partition(artifacts, opts.lane_key);
        // More permits than lanes can never be used.
        let max_jobs = opts.max_jobs.clamp(1, lanes.len().max(1));
        tracing::info!(tasks = total, lanes = lanes.len(), max_jobs, "running in parallel");

        let semaphore = Arc::new(Semaphore::new(max_jobs));
        let opts = Arc::new(opts.clone());
        let mut set = JoinSet::new();
        for lane in lanes {
            let semaphore = semaphore.clone();
            let agent = self.agent.clone();
            let opts = opts.clone();
            let cancel = self.cancel.clone();
            set.spawn(async move {
                // Held for the whole lane.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Vec::new(),
                };
                tracing::debug!(lane = %lane.key, tasks = lane.tasks.len(), "lane started");
                let mut done = Vec::with_capacity(lane.tasks.len());
                for (index, artifact) in &lane.tasks {
                    let result = execute(agent.as_ref(), artifact, &opts, cancel.clone()).await;
                    done.push((*index, result));
                }
                done
            });
        }

        let mut slots: Vec<Option<TaskResult>> = vec![None; total];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(done) => {
                    for (index, result) in done {
                        slots[index] = Some(result);
                    }
                }
                Err(err) => tracing::error!(error = %err, "lane task failed"),
            }
        }
        slots
            .into_iter()
            .zip(placeholders)
            .map(|(slot, placeholder)| slot.unwrap_or(placeholder))
            .collect()
    }
}
