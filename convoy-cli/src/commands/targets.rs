//! `convoy targets` — show the expanded job list without side effects.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use convoy_core::{expand, Bundle, Job};

/// Arguments for `convoy targets`.
#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Bundle directory containing target.yaml.
    #[arg(long)]
    pub bundle: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TargetsJson {
    jobs: Vec<Job>,
    warnings: Vec<String>,
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "org")]
    org: String,
    #[tabled(rename = "repo")]
    repo: String,
    #[tabled(rename = "branch")]
    branch: String,
}

impl TargetsArgs {
    pub fn run(self) -> Result<()> {
        let bundle = Bundle::open(&self.bundle)
            .with_context(|| format!("cannot open bundle '{}'", self.bundle.display()))?;
        let spec = bundle
            .load_targets()
            .context("failed to load target specification")?;
        let expansion = expand(&spec);
        let warnings: Vec<String> = expansion.warnings.iter().map(ToString::to_string).collect();

        if self.json {
            let payload = TargetsJson {
                jobs: expansion.jobs,
                warnings,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize targets JSON")?
            );
            return Ok(());
        }

        for warning in &warnings {
            eprintln!("{} {warning}", "warning:".yellow().bold());
        }
        if expansion.jobs.is_empty() {
            println!("No jobs in '{}'.", bundle.name);
            return Ok(());
        }
        let rows: Vec<JobRow> = expansion
            .jobs
            .iter()
            .enumerate()
            .map(|(i, job)| JobRow {
                index: i + 1,
                org: job.org.to_string(),
                repo: job.repo.to_string(),
                branch: job.branch.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{} job(s) in '{}'", expansion.jobs.len(), bundle.name.bold());
        Ok(())
    }
}
