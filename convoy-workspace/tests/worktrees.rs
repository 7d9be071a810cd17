//! Worktree creation against a real `git`. Skipped when git is unavailable.

use std::path::Path;

use convoy_core::Job;
use convoy_renderer::{parse_artifact, TemplateEngine};
use convoy_workspace::worktree::owning_repository;
use convoy_workspace::{
    CommandRunner, CommandSpec, Materializer, SystemRunner, WorkspaceMode, WorktreeError,
    WorktreeManager,
};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let spec = CommandSpec::new("git")
        .args(["-c", "user.name=convoy", "-c", "user.email=convoy@example.com"])
        .args(args.iter().copied())
        .current_dir(dir);
    let out = SystemRunner.run(&spec).expect("spawn git");
    assert!(out.success(), "{spec}: {}", out.failure_message());
}

fn git_available() -> bool {
    SystemRunner
        .run(&CommandSpec::new("git").arg("--version"))
        .map(|o| o.success())
        .unwrap_or(false)
}

/// `<tmp>/remote` with `main` and `feature/x`, cloned to `<tmp>/workspace/svc`.
fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let remote = tmp.path().join("remote");
    std::fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "-q"]);
    git(&remote, &["checkout", "-q", "-b", "main"]);
    std::fs::write(remote.join("README.md"), "hello\n").unwrap();
    git(&remote, &["add", "README.md"]);
    git(&remote, &["commit", "-q", "-m", "init"]);
    git(&remote, &["branch", "feature/x"]);

    let ws = tmp.path().join("workspace");
    std::fs::create_dir_all(&ws).unwrap();
    git(&ws, &["clone", "-q", &remote.display().to_string(), "svc"]);
    tmp
}

#[test]
fn remote_only_branch_gets_a_tracking_worktree() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let tmp = fixture();
    let repo = tmp.path().join("workspace").join("svc");
    let target = tmp.path().join("worktrees").join("001_svc_feature-x");
    let manager = WorktreeManager::new(&SystemRunner);

    let path = manager
        .create(&repo, &target, &"feature/x".into())
        .expect("worktree");

    assert!(path.join("README.md").is_file());
    let owner = owning_repository(&path).expect("gitdir file");
    assert_eq!(owner.canonicalize().unwrap(), repo.canonicalize().unwrap());

    // A second create at the same path replaces the first.
    manager
        .create(&repo, &target, &"feature/x".into())
        .expect("recreate");
    assert!(target.join("README.md").is_file());
}

#[test]
fn unknown_branch_is_reported() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let tmp = fixture();
    let repo = tmp.path().join("workspace").join("svc");
    let err = WorktreeManager::new(&SystemRunner)
        .create(&repo, &tmp.path().join("wt"), &"does-not-exist".into())
        .unwrap_err();
    assert!(matches!(err, WorktreeError::BranchNotFound { .. }));
}

#[test]
fn generated_document_points_at_a_git_managed_worktree() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let tmp = fixture();
    let engine = TemplateEngine::new(None).unwrap();
    let mode = WorkspaceMode::Worktree {
        dir: tmp.path().join("worktrees"),
    };
    let mut m = Materializer::new(&engine, &SystemRunner, tmp.path().join("tasks"), mode);
    let job = Job::new("acme", "svc", "main");

    let artifact = m
        .materialize(&job, "guide", "task", &tmp.path().join("workspace"))
        .expect("materialize")
        .expect("not skipped");

    let parsed = parse_artifact(&artifact.document_path).unwrap();
    assert_eq!(parsed.job, job);
    assert!(parsed.workspace_path.join(".git").exists());
    assert_eq!(parsed.workspace_path, tmp.path().join("worktrees").join("001_svc_main"));
}
