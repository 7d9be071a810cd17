//! Typed subprocess invocation.
//!
//! Every external call (git, gh) is a program plus an argument vector. Nothing
//! is ever passed through a shell, so branch names and repository names with
//! spaces, quotes or `$` reach the child process unchanged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A command to run: program, arguments, optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stdout.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Short human-readable failure description.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        let detail = if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        };
        match self.status {
            Some(code) if detail.is_empty() => format!("exit code {code}"),
            Some(code) => format!("exit code {code}: {detail}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Seam between provisioning logic and real processes.
pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr. `Err` only when the
    /// process could not be started at all.
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tracing::debug!(command = %spec, "running");
        let output = cmd.output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `git -C <repo> <args…>` as a [`CommandSpec`].
pub fn git_in(repo: &Path, args: &[&str]) -> CommandSpec {
    CommandSpec::new("git")
        .arg("-C")
        .arg(repo.display().to_string())
        .args(args.iter().copied())
}
