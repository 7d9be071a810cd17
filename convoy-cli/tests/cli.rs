use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn convoy_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("convoy"));
    cmd.current_dir(root).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_bundle(dir: &Path, target_yaml: &str) -> PathBuf {
    let bundle = dir.join("bundles").join("bump-deps");
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join("target.yaml"), target_yaml).unwrap();
    fs::write(bundle.join("task.md"), "Bump every dependency.\n").unwrap();
    fs::write(bundle.join("guide.md"), "Open one commit per change.\n").unwrap();
    bundle
}

#[test]
fn targets_json_lists_jobs_in_declaration_order() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc]\n    branches: [main, dev]\n",
    );

    let assert = convoy_cmd(root.path())
        .args(["targets", "--json", "--bundle"])
        .arg(&bundle)
        .assert()
        .success();
    let out: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();

    assert_eq!(
        out["jobs"],
        serde_json::json!([
            {"org": "acme", "repo": "svc", "branch": "main"},
            {"org": "acme", "repo": "svc", "branch": "dev"},
        ])
    );
    assert_eq!(out["warnings"], serde_json::json!([]));
}

#[test]
fn targets_reports_skipped_entries() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: []\n    branches: [main]\n  - org: acme\n    repos: [web]\n    branches: [main]\n",
    );

    convoy_cmd(root.path())
        .args(["targets", "--bundle"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(contains("web"))
        .stderr(contains("warning:"));
}

#[test]
fn conflicting_modes_fail_before_writing_anything() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc]\n    branches: [main]\n",
    );

    convoy_cmd(root.path())
        .args(["run", "--generate-only", "--run-only", "--bundle"])
        .arg(&bundle)
        .assert()
        .code(1)
        .stderr(contains("mutually exclusive"));

    for dir in ["workspace", "tasks", "logs", "worktrees"] {
        assert!(!root.path().join(dir).exists(), "{dir} must not be created");
    }
}

#[test]
fn invalid_max_jobs_is_rejected() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc]\n    branches: [main]\n",
    );

    convoy_cmd(root.path())
        .args(["run", "--max-jobs", "0", "--bundle"])
        .arg(&bundle)
        .assert()
        .code(1)
        .stderr(contains("maxJobs"));
}

#[test]
fn missing_guide_is_fatal() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc]\n    branches: [main]\n",
    );
    fs::remove_file(bundle.join("guide.md")).unwrap();

    convoy_cmd(root.path())
        .args(["run", "--generate-only", "--bundle"])
        .arg(&bundle)
        .assert()
        .code(1)
        .stderr(contains("guide file not found"));
    assert!(!root.path().join("tasks").exists());
}

#[test]
fn run_only_without_task_documents_is_fatal() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc]\n    branches: [main]\n",
    );

    convoy_cmd(root.path())
        .args(["run", "--run-only", "--bundle"])
        .arg(&bundle)
        .assert()
        .code(1)
        .stderr(contains("task documents not found"));
    assert!(!root.path().join("logs").exists());
}

#[test]
fn logs_without_saved_runs_fails() {
    let root = TempDir::new().unwrap();
    let bundle = write_bundle(root.path(), "target: []\n");

    convoy_cmd(root.path())
        .args(["logs", "--bundle"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(contains("no saved logs"));
}

// ---------------------------------------------------------------------------
// End to end with real git and a stand-in agent
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=convoy", "-c", "user.email=convoy@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A `claude` on PATH that reads the task from stdin and fails in `*/bad`.
#[cfg(unix)]
fn fake_agent(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let script = bin.join("claude");
    fs::write(
        &script,
        "#!/bin/sh\n\
         head -n 1\n\
         cat > /dev/null\n\
         case \"$(pwd)\" in */bad) echo broken >&2; exit 1;; esac\n\
         exit 0\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

#[cfg(unix)]
#[test]
fn generate_then_run_only_then_logs_then_clean() {
    let root = TempDir::new().unwrap();
    for repo in ["svc", "bad"] {
        let clone = root.path().join("workspace").join(repo);
        fs::create_dir_all(&clone).unwrap();
        if !git(&clone, &["init", "-q"]) {
            eprintln!("git not available; skipping");
            return;
        }
    }
    let bundle = write_bundle(
        root.path(),
        "target:\n  - org: acme\n    repos: [svc, bad]\n    branches: [main]\n",
    );

    // Existing clones: only the upstream remote is reconciled, no gh needed.
    convoy_cmd(root.path())
        .args(["run", "--generate-only", "--bundle"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(contains("Generated 2 task document(s)"));
    let tasks = root.path().join("tasks").join("bump-deps");
    let doc = fs::read_to_string(tasks.join("001_svc_main.md")).unwrap();
    assert!(doc.contains("- **Organization**: acme"));
    assert!(doc.contains("Open one commit per change."));
    assert!(doc.contains(&format!(
        "- **Workspace Path**: {}",
        root.path().canonicalize().unwrap().join("workspace").join("svc").display()
    )));

    let bin = fake_agent(root.path());
    let path = format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default());
    convoy_cmd(root.path())
        .env("PATH", path)
        .args(["run", "--run-only", "--parallel", "--max-jobs", "2", "--bundle"])
        .arg(&bundle)
        .assert()
        .code(1)
        .stdout(contains("1 succeeded, 1 failed, 2 total"));

    let logs = root.path().join("logs").join("bump-deps");
    let run_dir = fs::read_dir(&logs).unwrap().next().unwrap().unwrap().path();
    assert!(run_dir.join("summary.json").is_file());
    let svc_log = fs::read_to_string(run_dir.join("001_svc_main.log")).unwrap();
    assert!(svc_log.starts_with("# Task: 001_svc_main"));

    convoy_cmd(root.path())
        .args(["logs", "--task", "002_bad_main", "--bundle"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(contains("broken"));

    convoy_cmd(root.path())
        .args(["clean", "--bundle"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(contains("2 task document(s) removed"));
    assert!(fs::read_dir(&tasks).unwrap().next().is_none());
    assert!(predicate::path::is_dir().eval(&root.path().join("workspace").join("svc")));
}
