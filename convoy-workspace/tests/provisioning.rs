//! Provisioning and generation against a scripted `git`/`gh`.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use convoy_core::Job;
use convoy_renderer::{parse_artifact, TemplateEngine};
use convoy_workspace::{
    generate, load_artifacts, CommandOutput, CommandRunner, CommandSpec, GenerateRequest,
    ProvisionFailure, ProvisionOptions, ProvisionStep, Provisioner, RepositoryHandle,
};
use tempfile::TempDir;

/// Pretends to be `gh` and `git`. Clones create the directory and an
/// `origin` remote; remote changes are tracked per repository path.
#[derive(Default)]
struct FakeHost {
    calls: RefCell<Vec<CommandSpec>>,
    remotes: RefCell<HashMap<PathBuf, BTreeMap<String, String>>>,
    forks: RefCell<BTreeSet<String>>,
    logged_out: bool,
    /// Repositories whose clone fails after leaving a partial directory.
    broken: BTreeSet<String>,
}

impl FakeHost {
    fn ok(stdout: &str) -> std::io::Result<CommandOutput> {
        Ok(CommandOutput {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    fn err(stderr: &str) -> std::io::Result<CommandOutput> {
        Ok(CommandOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    fn count(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.to_string().contains(needle))
            .count()
    }

    fn gh(&self, args: &[String]) -> std::io::Result<CommandOutput> {
        match args.first().map(String::as_str) {
            Some("api") if self.logged_out => {
                Self::err("To get started with GitHub CLI, please run:  gh auth login")
            }
            Some("api") => Self::ok("octo\n"),
            Some("repo") if args[1] == "view" => {
                if self.forks.borrow().contains(&args[2]) {
                    Self::ok("{\"name\":\"x\"}")
                } else {
                    Self::err("GraphQL: Could not resolve to a Repository")
                }
            }
            Some("repo") if args[1] == "fork" => {
                let repo = args[2].rsplit('/').next().unwrap_or_default();
                self.forks.borrow_mut().insert(format!("octo/{repo}"));
                Self::ok("")
            }
            _ => Self::err("unexpected gh call"),
        }
    }

    fn git(&self, args: &[String]) -> std::io::Result<CommandOutput> {
        if args[0] == "clone" {
            let dest = PathBuf::from(args.last().unwrap());
            let url = &args[args.len() - 2];
            std::fs::create_dir_all(&dest)?;
            let name = dest.file_name().unwrap().to_string_lossy().into_owned();
            if self.broken.contains(&name) {
                return Self::err("fatal: early EOF");
            }
            let mut remotes = BTreeMap::new();
            remotes.insert("origin".to_string(), url.clone());
            self.remotes.borrow_mut().insert(dest, remotes);
            return Self::ok("");
        }
        assert_eq!(args[0], "-C");
        let repo = PathBuf::from(&args[1]);
        let rest: Vec<&str> = args[2..].iter().map(String::as_str).collect();
        let mut all = self.remotes.borrow_mut();
        let remotes = all.entry(repo).or_default();
        match rest.as_slice() {
            ["remote", "-v"] => {
                let out: String = remotes
                    .iter()
                    .map(|(n, u)| format!("{n}\t{u} (fetch)\n{n}\t{u} (push)\n"))
                    .collect();
                Self::ok(&out)
            }
            ["remote", "add", name, url] => {
                if remotes.contains_key(*name) {
                    return Self::err("error: remote upstream already exists.");
                }
                remotes.insert(name.to_string(), url.to_string());
                Self::ok("")
            }
            ["remote", "set-url", name, url] => {
                remotes.insert(name.to_string(), url.to_string());
                Self::ok("")
            }
            _ => Self::err("unexpected git call"),
        }
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        match spec.program.as_str() {
            "gh" => self.gh(&spec.args),
            "git" => self.git(&spec.args),
            other => Err(std::io::Error::new(std::io::ErrorKind::NotFound, other.to_string())),
        }
    }
}

fn ensure(
    prov: &mut Provisioner<'_, FakeHost>,
    ws: &Path,
    org: &str,
    repo: &str,
) -> Result<RepositoryHandle, ProvisionFailure> {
    prov.ensure_repository(&org.into(), &repo.into(), ws, ProvisionOptions::default())
}

#[test]
fn first_run_forks_clones_and_adds_upstream() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost::default();
    let mut prov = Provisioner::new(&host);

    let handle = ensure(&mut prov, ws.path(), "acme", "svc").expect("provisioned");

    assert!(handle.cloned);
    assert_eq!(handle.path, ws.path().join("svc"));
    assert_eq!(host.count("gh repo fork acme/svc --clone=false"), 1);
    assert_eq!(host.count("git clone https://github.com/octo/svc.git"), 1);
    let state = prov.state(&"svc".into()).unwrap();
    assert_eq!(state.upstream(), Some("https://github.com/acme/svc.git"));
    assert_eq!(state.origin(), Some("https://github.com/octo/svc.git"));
}

#[test]
fn second_run_only_checks_remotes() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost::default();

    let mut first = Provisioner::new(&host);
    ensure(&mut first, ws.path(), "acme", "svc").unwrap();
    let state_after_first = first.state(&"svc".into()).cloned();
    let calls_after_first = host.calls.borrow().len();

    let mut second = Provisioner::new(&host);
    let handle = ensure(&mut second, ws.path(), "acme", "svc").unwrap();

    assert!(!handle.cloned);
    assert_eq!(second.state(&"svc".into()).cloned(), state_after_first);
    let new_calls: Vec<String> = host.calls.borrow()[calls_after_first..]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(new_calls.len(), 1, "only `git remote -v` expected, got {new_calls:?}");
    assert!(new_calls[0].ends_with("remote -v"));
    assert_eq!(host.count("remote add upstream"), 1);
}

#[test]
fn stale_upstream_is_repointed_to_current_org() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost::default();
    let mut prov = Provisioner::new(&host);
    ensure(&mut prov, ws.path(), "old-org", "svc").unwrap();

    ensure(&mut prov, ws.path(), "acme", "svc").unwrap();

    assert_eq!(host.count("remote set-url upstream https://github.com/acme/svc.git"), 1);
    assert_eq!(
        prov.state(&"svc".into()).unwrap().upstream(),
        Some("https://github.com/acme/svc.git")
    );
}

#[test]
fn existing_fork_is_not_forked_again() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost::default();
    host.forks.borrow_mut().insert("octo/svc".to_string());
    let mut prov = Provisioner::new(&host);

    ensure(&mut prov, ws.path(), "acme", "svc").unwrap();
    assert_eq!(host.count("repo fork"), 0);
}

#[test]
fn unauthenticated_user_fails_at_identity_step() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost {
        logged_out: true,
        ..Default::default()
    };
    let mut prov = Provisioner::new(&host);

    let failure = ensure(&mut prov, ws.path(), "acme", "svc").unwrap_err();
    assert_eq!(failure.step, ProvisionStep::ResolveIdentity);
    assert!(failure.is_auth());
    assert_eq!(host.count("git clone"), 0);

    // Not memoized: the next repository asks again.
    ensure(&mut prov, ws.path(), "acme", "web").unwrap_err();
    assert_eq!(host.count("gh api user"), 2);
}

#[test]
fn failed_clone_leaves_no_partial_directory() {
    let ws = TempDir::new().unwrap();
    let host = FakeHost {
        broken: ["svc".to_string()].into(),
        ..Default::default()
    };
    let mut prov = Provisioner::new(&host);

    let failure = ensure(&mut prov, ws.path(), "acme", "svc").unwrap_err();
    assert_eq!(failure.step, ProvisionStep::Clone);
    assert!(!ws.path().join("svc").exists());
}

#[test]
fn failing_repository_does_not_block_the_others() {
    let root = TempDir::new().unwrap();
    let ws = root.path().join("workspace");
    let host = FakeHost {
        broken: ["broken".to_string()].into(),
        ..Default::default()
    };
    let engine = TemplateEngine::new(None).unwrap();
    let jobs = vec![
        Job::new("acme", "svc", "main"),
        Job::new("acme", "broken", "main"),
        Job::new("acme", "web", "dev"),
        Job::new("acme", "broken", "dev"),
    ];
    let req = GenerateRequest {
        root: root.path(),
        bundle: "bump",
        jobs: &jobs,
        guide: "guide text",
        task: "task text",
        shallow: true,
        worktree: false,
    };

    let report = generate(&host, &engine, &ws, &req).expect("generate");

    let ids: Vec<&str> = report.artifacts.iter().map(|a| a.task_id.as_str()).collect();
    assert_eq!(ids, vec!["001_svc_main", "002_web_dev"]);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped.iter().all(|s| s.job.repo.0 == "broken"));
    assert_eq!(host.count("git clone --depth 1"), 3);

    let parsed = parse_artifact(&report.artifacts[1].document_path).unwrap();
    assert_eq!(parsed.job, jobs[2]);
    assert_eq!(parsed.workspace_path, ws.join("web"));
}

#[test]
fn regeneration_removes_stale_documents() {
    let root = TempDir::new().unwrap();
    let ws = root.path().join("workspace");
    let host = FakeHost::default();
    let engine = TemplateEngine::new(None).unwrap();
    let stale = root.path().join("tasks").join("bump").join("009_old_main.md");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();

    let jobs = vec![Job::new("acme", "svc", "main")];
    let req = GenerateRequest {
        root: root.path(),
        bundle: "bump",
        jobs: &jobs,
        guide: "g",
        task: "t",
        shallow: false,
        worktree: false,
    };
    generate(&host, &engine, &ws, &req).unwrap();

    assert!(!stale.exists());
    let loaded = load_artifacts(&root.path().join("tasks").join("bump")).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].job, jobs[0]);
}
