//! System git backend
//!
//! Drives the `git` binary with an isolated environment. One `SystemGit`
//! handle corresponds to one package working tree.

use super::VcsProvider;
use crate::core::error::{GitError, RepoError, RepoResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git
#[derive(Debug, Clone)]
pub struct SystemGit {
  /// Directory passed to `git -C`
  pub(crate) repo_path: PathBuf,

  /// Working tree root as reported by git
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// `path` may be any directory inside a working tree; `work_tree` records
  /// the enclosing root so callers can verify they got the tree they expect.
  pub fn open(path: &Path) -> RepoResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RepoError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RepoError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Initialize an empty repository at `path` and open it
  pub fn init(path: &Path) -> RepoResult<Self> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))?;

    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .arg("init")
      .output()
      .context("Failed to execute git init")?;

    if !output.status.success() {
      return Err(RepoError::Git(GitError::CommandFailed {
        command: "git init".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    tracing::debug!("Initialized empty repository in {}", path.display());
    Self::open(path)
  }

  /// Run git and return trimmed stdout, failing on a non-zero exit
  pub(crate) fn run(&self, args: &[&str]) -> RepoResult<String> {
    tracing::debug!("git -C {} {}", self.repo_path.display(), args.join(" "));

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.first().copied().unwrap_or_default()))?;

    if !output.status.success() {
      return Err(RepoError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run git where a non-zero exit means "no" rather than an error
  pub(crate) fn probe(&self, args: &[&str]) -> RepoResult<Option<String>> {
    tracing::debug!("git -C {} {}", self.repo_path.display(), args.join(" "));

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.first().copied().unwrap_or_default()))?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists PATH, HOME and the SSH agent/command
  /// - Never prompts for credentials
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    cmd.env_clear();
    for key in ["PATH", "HOME", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND"] {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }
}

/// Opens package repositories with [`SystemGit`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGitProvider;

impl VcsProvider for SystemGitProvider {
  type Repo = SystemGit;

  fn ensure_repo(&self, path: &Path) -> RepoResult<SystemGit> {
    if needs_init(path) {
      return SystemGit::init(path);
    }
    match SystemGit::open(path) {
      // A populated directory outside any working tree, e.g. an in-place
      // workspace root holding repoman.toml
      Err(RepoError::Git(GitError::RepoNotFound { .. })) => SystemGit::init(path),
      other => other,
    }
  }

  fn open_repo(&self, path: &Path) -> RepoResult<SystemGit> {
    SystemGit::open(path)
  }
}

/// A missing or empty directory gets a fresh repository without probing git
fn needs_init(path: &Path) -> bool {
  if !path.exists() {
    return true;
  }
  if path.join(".git").exists() {
    return false;
  }
  fs::read_dir(path).map(|mut entries| entries.next().is_none()).unwrap_or(false)
}

/// Refs that git would parse as options are never passed through
pub(crate) fn ensure_safe_ref(reference: &str) -> RepoResult<()> {
  if reference.is_empty() || reference.starts_with('-') {
    return Err(RepoError::message(format!("Refusing to use '{}' as a git ref", reference)));
  }
  Ok(())
}

/// Abbreviated or full commit id
pub(crate) fn looks_like_commit_id(reference: &str) -> bool {
  (7..=40).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit())
}
