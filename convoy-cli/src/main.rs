//! Convoy — run one AI coding task across many repositories.
//!
//! # Usage
//!
//! ```text
//! convoy run --bundle <dir> [--root <dir>] [--generate-only | --run-only] [--parallel] [--max-jobs N] ...
//! convoy targets --bundle <dir> [--json]
//! convoy logs --bundle <dir> [--root <dir>] [--task <id>] [--lines N]
//! convoy clean --bundle <dir> [--root <dir>] [--worktrees]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{clean::CleanArgs, logs::LogsArgs, run::RunArgs, targets::TargetsArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "convoy",
    version,
    about = "Fork, clone and run an AI coding agent across many repositories",
    long_about = None,
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision repositories, generate task documents and run the agent.
    Run(RunArgs),

    /// Print the jobs a bundle's target specification expands to.
    Targets(TargetsArgs),

    /// Show logs of the latest run.
    Logs(LogsArgs),

    /// Remove generated task documents (and optionally worktrees).
    Clean(CleanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    convoy_runner::init_tracing(cli.verbose);
    match cli.command {
        Commands::Run(args) => {
            let code = args.run()?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Targets(args) => args.run(),
        Commands::Logs(args) => args.run(),
        Commands::Clean(args) => args.run(),
    }
}
