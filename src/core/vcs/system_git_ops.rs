//! `Vcs` implementation for SystemGit (remotes, fetch, checkout, tagging)

use super::system_git::{SystemGit, ensure_safe_ref, looks_like_commit_id};
use super::{RefLocation, ResolvedRef, Vcs};
use crate::core::error::{GitError, RepoError, RepoResult, ResultExt};
use std::path::Path;

impl SystemGit {
  /// List all remotes as (name, fetch url)
  pub fn list_remotes(&self) -> RepoResult<Vec<(String, String)>> {
    let Some(stdout) = self.probe(&["remote", "-v"])? else {
      return Ok(vec![]);
    };

    let mut remotes = Vec::new();
    for line in stdout.lines() {
      // Format: "origin  git@github.com:user/repo.git (fetch)"
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && line.contains("(fetch)") {
        remotes.push((parts[0].to_string(), parts[1].to_string()));
      }
    }

    Ok(remotes)
  }

  /// Add a remote repository
  pub fn add_remote(&self, name: &str, url: &str) -> RepoResult<()> {
    let output = self
      .git_cmd()
      .args(["remote", "add", name, url])
      .output()
      .context("Failed to add remote")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("already exists") {
        return Ok(());
      }
      return Err(RepoError::Git(GitError::CommandFailed {
        command: "git remote add".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(())
  }

  /// Commit a revision points to, `None` if it does not resolve
  fn rev_parse_commit(&self, spec: &str) -> RepoResult<Option<String>> {
    self.probe(&["rev-parse", "--verify", "--quiet", &format!("{}^{{commit}}", spec)])
  }

  /// Default branch advertised by the remote (`ls-remote --symref`)
  fn remote_default_branch(&self, remote: &str) -> RepoResult<Option<String>> {
    let Some(stdout) = self.probe(&["ls-remote", "--symref", remote, "HEAD"])? else {
      return Ok(None);
    };

    // Format: "ref: refs/heads/main\tHEAD"
    Ok(stdout.lines().find_map(|line| {
      line
        .strip_prefix("ref: refs/heads/")
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
    }))
  }
}

impl Vcs for SystemGit {
  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn ensure_remote(&self, name: &str, url: &str) -> RepoResult<()> {
    let remotes = self.list_remotes()?;
    match remotes.iter().find(|(n, _)| n == name) {
      Some((_, existing)) if existing != url => {
        tracing::warn!(
          "Remote '{}' in {} points to {}, expected {}",
          name,
          self.work_tree.display(),
          existing,
          url
        );
        Ok(())
      }
      Some(_) => Ok(()),
      None => {
        tracing::debug!("Registering remote {} -> {}", name, url);
        self.add_remote(name, url)
      }
    }
  }

  fn fetch(&self, remote: &str, tags: bool) -> RepoResult<()> {
    if tags {
      self.run(&["fetch", "--tags", remote])?;
    } else {
      self.run(&["fetch", remote])?;
    }
    Ok(())
  }

  fn resolve_ref(&self, reference: &str, remote: &str) -> RepoResult<Option<ResolvedRef>> {
    ensure_safe_ref(reference)?;

    let found = |location: RefLocation, commit: String, is_tag: bool| {
      Some(ResolvedRef {
        name: reference.to_string(),
        location,
        commit,
        is_tag,
      })
    };

    if let Some(commit) = self.rev_parse_commit(&format!("refs/tags/{}", reference))? {
      return Ok(found(RefLocation::History, commit, true));
    }
    if looks_like_commit_id(reference)
      && let Some(commit) = self.rev_parse_commit(reference)?
    {
      return Ok(found(RefLocation::History, commit, false));
    }
    if let Some(commit) = self.rev_parse_commit(&format!("refs/remotes/{}/{}", remote, reference))? {
      return Ok(found(RefLocation::Remote, commit, false));
    }
    if let Some(commit) = self.rev_parse_commit(&format!("refs/heads/{}", reference))? {
      return Ok(found(RefLocation::Local, commit, false));
    }
    // Anything else git understands ("tags/v0", "HEAD~2", ...)
    if let Some(commit) = self.rev_parse_commit(reference)? {
      return Ok(found(RefLocation::History, commit, false));
    }

    Ok(None)
  }

  fn resolve_commit(&self, reference: &str) -> RepoResult<String> {
    ensure_safe_ref(reference)?;
    self.rev_parse_commit(reference)?.ok_or_else(|| {
      RepoError::Git(GitError::CommandFailed {
        command: format!("git rev-parse {}", reference),
        stderr: format!("'{}' does not name a commit", reference),
      })
    })
  }

  fn head_ref(&self, remote: &str) -> RepoResult<String> {
    match self.probe(&["symbolic-ref", "--quiet", "--short", "HEAD"])? {
      Some(branch) => {
        if self.rev_parse_commit("HEAD")?.is_some() {
          return Ok(branch);
        }
        // Unborn branch in a fresh repository: follow the remote's default
        Ok(self.remote_default_branch(remote)?.unwrap_or(branch))
      }
      None => self.head_commit(),
    }
  }

  fn checkout(&self, reference: &str, subpath: Option<&str>, force: bool) -> RepoResult<()> {
    ensure_safe_ref(reference)?;

    let mut args = vec!["checkout"];
    if force {
      args.push("-f");
    }
    args.push(reference);
    if let Some(subpath) = subpath {
      args.push("--");
      args.push(subpath);
    }

    self.run(&args)?;
    Ok(())
  }

  fn reset_hard(&self, reference: &str) -> RepoResult<()> {
    ensure_safe_ref(reference)?;
    self.run(&["reset", "--hard", reference])?;
    Ok(())
  }

  fn is_dirty(&self) -> RepoResult<bool> {
    let status = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
    Ok(!status.is_empty())
  }

  fn describe_nearest_tag(&self, pattern: &str) -> RepoResult<Option<String>> {
    let described = self.probe(&["describe", "--tags", "--match", pattern])?;
    if described.is_none() {
      tracing::debug!("No tag matching '{}' in {}", pattern, self.work_tree.display());
    }
    Ok(described.filter(|d| !d.is_empty()))
  }

  fn stage_and_commit(&self, message: &str) -> RepoResult<Option<String>> {
    self.run(&["add", "--update"])?;

    // Exit status 0 means the index matches HEAD
    if self.probe(&["diff", "--cached", "--quiet"])?.is_some() {
      return Ok(None);
    }

    self.run(&["commit", "-m", message])?;
    Ok(Some(self.head_commit()?))
  }

  fn create_tag(&self, name: &str, reference: &str, message: &str) -> RepoResult<()> {
    ensure_safe_ref(name)?;
    ensure_safe_ref(reference)?;
    self.run(&["tag", "-a", name, "-m", message, reference])?;
    Ok(())
  }

  fn tag_exists(&self, name: &str) -> RepoResult<bool> {
    Ok(
      self
        .probe(&["rev-parse", "--verify", "--quiet", &format!("refs/tags/{}", name)])?
        .is_some(),
    )
  }

  fn push(&self, remote: &str, reference: &str) -> RepoResult<()> {
    ensure_safe_ref(reference)?;
    tracing::info!("Pushing {} to {}", reference, remote);

    let output = self
      .git_cmd()
      .args(["push", remote, reference])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RepoError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        reference: reference.to_string(),
        reason: stderr.to_string(),
      }));
    }

    Ok(())
  }

  fn head_commit(&self) -> RepoResult<String> {
    self.run(&["rev-parse", "HEAD"])
  }

  fn current_branch(&self) -> RepoResult<Option<String>> {
    self.probe(&["symbolic-ref", "--quiet", "--short", "HEAD"])
  }
}
