//! `convoy run` — the main pipeline: provision, generate, execute, summarize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use convoy_core::paths::{run_logs_dir, tasks_dir, templates_dir, workspace_dir};
use convoy_core::{expand, AgentKind, Bundle, Config, ConfigError, ConfigLayer};
use convoy_renderer::TemplateEngine;
use convoy_runner::paths::run_stamp;
use convoy_runner::{
    start_blocking, LaneKey, ProcessAgent, RunOptions, RunRequest, RunSummary, TaskResult,
};
use convoy_workspace::{generate, load_artifacts, GenerateRequest, GenerationReport, SystemRunner};

use super::absolute_root;

/// Arguments for `convoy run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Bundle directory (target.yaml, task.md, optional guide.md / config.json).
    #[arg(long)]
    pub bundle: PathBuf,

    /// Root holding workspace/, tasks/, logs/ and the root config.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Workflow guide; relative paths are tried against the bundle, then the root.
    #[arg(long)]
    pub guide_file: Option<PathBuf>,

    /// Provision and write task documents, but do not run the agent.
    #[arg(long)]
    pub generate_only: bool,

    /// Run the agent on previously generated task documents.
    #[arg(long)]
    pub run_only: bool,

    /// Write each task's output to logs/<bundle>/<run>/<task>.log.
    #[arg(long)]
    pub save_logs: bool,

    /// Run repositories concurrently (implies --save-logs).
    #[arg(long)]
    pub parallel: bool,

    /// Concurrency cap in parallel mode.
    #[arg(long, allow_negative_numbers = true)]
    pub max_jobs: Option<i64>,

    /// Clone with --depth 1.
    #[arg(long, conflicts_with = "full_clone")]
    pub shallow_clone: bool,

    /// Clone full history even if config enables shallow clones.
    #[arg(long)]
    pub full_clone: bool,

    /// Give every task its own git worktree.
    #[arg(long)]
    pub worktree: bool,

    /// Agent CLI: claude, gemini or codex.
    #[arg(long)]
    pub agent: Option<AgentKind>,

    /// Kill an agent that runs longer than this many seconds.
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Flags as the highest-priority config layer. Unset flags fall through.
    fn config_layer(&self) -> ConfigLayer {
        let shallow_clone = if self.shallow_clone {
            Some(true)
        } else if self.full_clone {
            Some(false)
        } else {
            None
        };
        ConfigLayer {
            parallel: self.parallel.then_some(true),
            max_jobs: self.max_jobs,
            save_logs: self.save_logs.then_some(true),
            generate_only: self.generate_only.then_some(true),
            run_only: self.run_only.then_some(true),
            guide_file: self.guide_file.clone(),
            shallow_clone,
            worktree: self.worktree.then_some(true),
            agent: self.agent,
            agent_args: None,
            task_timeout_secs: self.timeout,
        }
    }

    /// Returns the process exit code.
    pub fn run(self) -> Result<i32> {
        let bundle = Bundle::open(&self.bundle)
            .with_context(|| format!("cannot open bundle '{}'", self.bundle.display()))?;
        let root = absolute_root(&self.root)?;
        let config = bundle
            .resolve_config(&root, self.config_layer())
            .context("invalid configuration")?;

        let tasks = tasks_dir(&root, &bundle.name);
        let (artifacts, skipped) = if config.run_only {
            let artifacts = load_artifacts(&tasks)
                .with_context(|| format!("failed to read task documents in {}", tasks.display()))?;
            if artifacts.is_empty() {
                return Err(ConfigError::MissingFile {
                    what: "task documents",
                    path: tasks,
                })
                .context("nothing to run; generate task documents without --run-only first");
            }
            (artifacts, Vec::new())
        } else {
            let report = generate_tasks(&bundle, &root, &config)?;
            if config.generate_only {
                return print_generation(&report, self.json);
            }
            if !self.json {
                print_generation_line(&report);
            }
            let skipped = report
                .skipped
                .into_iter()
                .map(|s| TaskResult::skipped(s.job, s.reason))
                .collect();
            (report.artifacts, skipped)
        };

        let log_dir = config
            .save_logs
            .then(|| run_logs_dir(&root, &bundle.name, &run_stamp(Utc::now())));
        let (program, args) = config.agent_command();
        let request = RunRequest {
            agent: Arc::new(ProcessAgent::new(program, args)),
            artifacts,
            skipped,
            options: RunOptions {
                parallel: config.parallel,
                max_jobs: config.max_jobs,
                lane_key: if config.worktree {
                    LaneKey::WorkspacePath
                } else {
                    LaneKey::Repository
                },
                log_dir: log_dir.clone(),
                task_timeout: config.task_timeout,
            },
        };
        let summary = start_blocking(request).context("run failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize summary JSON")?
            );
        } else {
            print_summary(&summary, log_dir.as_deref());
        }
        Ok(summary.exit_code())
    }
}

fn generate_tasks(bundle: &Bundle, root: &Path, config: &Config) -> Result<GenerationReport> {
    let spec = bundle.load_targets().context("failed to load target specification")?;
    let expansion = expand(&spec);
    for warning in &expansion.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    let task = bundle.load_task().context("failed to load task description")?;
    let guide = bundle
        .load_guide(root, config.guide_file.as_deref())
        .context("failed to load workflow guide")?;

    let engine = TemplateEngine::new(Some(&templates_dir(root)))
        .context("failed to load task document template")?;
    let request = GenerateRequest {
        root,
        bundle: &bundle.name,
        jobs: &expansion.jobs,
        guide: &guide,
        task: &task,
        shallow: config.shallow_clone,
        worktree: config.worktree,
    };
    generate(&SystemRunner, &engine, &workspace_dir(root), &request)
        .context("failed to generate task documents")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerationJson<'a> {
    generated: usize,
    skipped: usize,
    #[serde(flatten)]
    report: &'a GenerationReport,
}

fn print_generation(report: &GenerationReport, json: bool) -> Result<i32> {
    let code = i32::from(!report.skipped.is_empty());
    if json {
        let payload = GenerationJson {
            generated: report.artifacts.len(),
            skipped: report.skipped.len(),
            report,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize generation JSON")?
        );
        return Ok(code);
    }

    print_generation_line(report);
    for artifact in &report.artifacts {
        println!("  {} {}", "✓".green(), artifact.document_path.display());
    }
    Ok(code)
}

fn print_generation_line(report: &GenerationReport) {
    println!(
        "Generated {} task document(s), skipped {} job(s)",
        report.artifacts.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  {} {} — {}", "✗".red(), skipped.job, skipped.reason);
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "target")]
    target: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "duration")]
    duration: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn detail(error: Option<&str>, log: Option<&Path>) -> String {
    match (error, log) {
        (Some(error), Some(log)) => format!("{error} (log: {})", log.display()),
        (Some(error), None) => error.to_string(),
        (None, Some(log)) => log.display().to_string(),
        (None, None) => String::new(),
    }
}

fn print_summary(summary: &RunSummary, log_dir: Option<&Path>) {
    if summary.tasks.is_empty() {
        println!("Nothing to run.");
        return;
    }
    let rows: Vec<ResultRow> = summary
        .tasks
        .iter()
        .map(|t| ResultRow {
            task: t.task_name.clone(),
            target: t.job.to_string(),
            status: if t.success {
                "PASS".green().to_string()
            } else {
                "FAIL".red().to_string()
            },
            duration: format!("{:.1}s", t.duration_seconds),
            detail: detail(t.error.as_deref(), t.log_path.as_deref()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let headline = format!(
        "{} succeeded, {} failed, {} total in {:.1}s",
        summary.successful, summary.failed, summary.total, summary.duration_seconds
    );
    if summary.failed == 0 {
        println!("{}", headline.green().bold());
    } else {
        println!("{}", headline.red().bold());
    }
    if let Some(dir) = log_dir {
        println!("Logs: {}", dir.display());
    }
}
