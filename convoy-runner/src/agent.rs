//! Agent invocation: one coding-agent CLI process per task.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;

/// What to run the agent against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocation {
    pub task_id: String,
    /// Working directory of the agent process.
    pub workdir: PathBuf,
    /// Task document, written to the agent's stdin.
    pub input: String,
    /// Combined stdout/stderr destination; `None` inherits the console.
    pub log_path: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// How an agent call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Process exited; `None` when killed by a signal.
    Exited { code: Option<i32> },
    /// Process could not be started or its log could not be opened.
    Failed(String),
    Cancelled,
    TimedOut(Duration),
}

impl AgentOutcome {
    pub fn success(&self) -> bool {
        matches!(self, AgentOutcome::Exited { code: Some(0) })
    }
}

/// Seam between the scheduler and real agent processes.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run one task to completion. Must return promptly with
    /// [`AgentOutcome::Cancelled`] once `cancel` turns `true`.
    async fn run(&self, invocation: AgentInvocation, cancel: watch::Receiver<bool>)
        -> AgentOutcome;
}

/// Resolves once `cancel` is `true`; never if the sender is gone.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessAgent
// ---------------------------------------------------------------------------

/// Spawns the agent CLI as a child process. Arguments are passed as a vector,
/// never through a shell.
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    program: String,
    args: Vec<String>,
}

impl ProcessAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        ProcessAgent {
            program: program.into(),
            args,
        }
    }

    fn command(&self, inv: &AgentInvocation) -> Result<Command, String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&inv.workdir)
            .stdin(Stdio::piped())
            .kill_on_drop(true);
        match &inv.log_path {
            Some(path) => {
                let open_err = |e: std::io::Error| format!("cannot open log {}: {e}", path.display());
                let out = std::fs::File::create(path).map_err(open_err)?;
                let err = out.try_clone().map_err(open_err)?;
                cmd.stdout(Stdio::from(out)).stderr(Stdio::from(err));
            }
            None => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }
        Ok(cmd)
    }
}

#[async_trait]
impl AgentRunner for ProcessAgent {
    async fn run(
        &self,
        invocation: AgentInvocation,
        mut cancel: watch::Receiver<bool>,
    ) -> AgentOutcome {
        let mut cmd = match self.command(&invocation) {
            Ok(cmd) => cmd,
            Err(message) => return AgentOutcome::Failed(message),
        };
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return AgentOutcome::Failed(format!("failed to start `{}`: {e}", self.program)),
        };
        tracing::debug!(task = %invocation.task_id, pid = ?child.id(), program = %self.program, "agent started");

        if let Some(mut stdin) = child.stdin.take() {
            let input = invocation.input;
            let task = invocation.task_id.clone();
            tokio::spawn(async move {
                // The agent may exit without draining stdin.
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(task = %task, error = %e, "agent closed stdin early");
                }
            });
        }

        let timeout = invocation.timeout;
        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => AgentOutcome::Exited { code: status.code() },
                Err(e) => AgentOutcome::Failed(format!("waiting for agent failed: {e}")),
            },
            _ = cancelled(&mut cancel) => {
                stop(&mut child, &invocation.task_id).await;
                AgentOutcome::Cancelled
            }
            _ = deadline => {
                stop(&mut child, &invocation.task_id).await;
                AgentOutcome::TimedOut(timeout.unwrap_or_default())
            }
        }
    }
}

async fn stop(child: &mut Child, task: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!(task, error = %e, "failed to kill agent process");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn invocation(dir: &TempDir, log: bool) -> AgentInvocation {
        AgentInvocation {
            task_id: "001_svc_main".into(),
            workdir: dir.path().to_path_buf(),
            input: "# Task: 001_svc_main\n".into(),
            log_path: log.then(|| dir.path().join("001_svc_main.log")),
            timeout: None,
        }
    }

    fn sh(script: &str) -> ProcessAgent {
        ProcessAgent::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn stdin_reaches_agent_and_output_is_logged() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(false);
        let outcome = sh("cat; echo oops >&2").run(invocation(&dir, true), rx).await;
        assert!(outcome.success());
        let log = std::fs::read_to_string(dir.path().join("001_svc_main.log")).unwrap();
        assert!(log.contains("# Task: 001_svc_main"));
        assert!(log.contains("oops"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(false);
        let outcome = sh("exit 3").run(invocation(&dir, true), rx).await;
        assert_eq!(outcome, AgentOutcome::Exited { code: Some(3) });
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(false);
        let outcome = ProcessAgent::new("convoy-no-such-agent", vec![])
            .run(invocation(&dir, false), rx)
            .await;
        assert!(matches!(outcome, AgentOutcome::Failed(msg) if msg.contains("convoy-no-such-agent")));
    }

    #[tokio::test]
    async fn timeout_kills_the_agent() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(false);
        let mut inv = invocation(&dir, true);
        inv.timeout = Some(Duration::from_millis(100));
        let outcome = sh("sleep 30").run(inv, rx).await;
        assert_eq!(outcome, AgentOutcome::TimedOut(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn cancellation_kills_the_agent() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });
        let outcome = sh("sleep 30").run(invocation(&dir, true), rx).await;
        assert_eq!(outcome, AgentOutcome::Cancelled);
    }
}
