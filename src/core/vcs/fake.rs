//! In-memory `Vcs` used by unit tests

use super::{RefLocation, ResolvedRef, Vcs, VcsProvider};
use crate::core::error::{GitError, RepoError, RepoResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
  /// Reported working tree root; defaults to the repository path.
  /// Read when a handle is created.
  pub work_tree: Option<PathBuf>,
  pub remotes: Vec<(String, String)>,
  /// Branches on the remote, visible after a successful fetch
  pub remote_branches: HashMap<String, String>,
  /// Tags on the remote, copied locally by a successful fetch
  pub remote_tags: HashMap<String, String>,
  pub remote_default_branch: Option<String>,
  pub fetched: bool,
  pub local_branches: HashMap<String, String>,
  /// tag -> (commit, message)
  pub tags: HashMap<String, (String, String)>,
  pub head_branch: Option<String>,
  pub head_commit: Option<String>,
  /// Upcoming fetch calls that fail
  pub fetch_failures: usize,
  /// Fetch attempts (calls with `tags = true`)
  pub fetch_attempts: usize,
  pub checkouts: Vec<(String, Option<String>, bool)>,
  pub resets: Vec<String>,
  pub dirty: bool,
  /// Local modifications that block a non-forced checkout
  pub blocking_changes: bool,
  pub describe: Option<String>,
  pub commits: Vec<(String, String)>,
  pub pushes: Vec<(String, String)>,
}

impl FakeState {
  fn known_commit(&self, reference: &str) -> bool {
    self.remote_branches.values().any(|c| c == reference)
      || self.local_branches.values().any(|c| c == reference)
      || self.tags.values().any(|(c, _)| c == reference)
      || self.commits.iter().any(|(c, _)| c == reference)
  }

  fn lookup(&self, reference: &str, remote: &str) -> Option<String> {
    if reference == "HEAD" {
      return self.head_commit.clone();
    }
    if let Some(tag) = reference.strip_prefix("refs/tags/") {
      return self.tags.get(tag).map(|(c, _)| c.clone());
    }
    if let Some((c, _)) = self.tags.get(reference) {
      return Some(c.clone());
    }
    if let Some(c) = self.local_branches.get(reference) {
      return Some(c.clone());
    }
    if self.fetched
      && let Some(branch) = reference.strip_prefix(&format!("{}/", remote))
      && let Some(c) = self.remote_branches.get(branch)
    {
      return Some(c.clone());
    }
    if self.known_commit(reference) {
      return Some(reference.to_string());
    }
    None
  }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeRepo {
  work_tree: PathBuf,
  pub state: Rc<RefCell<FakeState>>,
}

impl Vcs for FakeRepo {
  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn ensure_remote(&self, name: &str, url: &str) -> RepoResult<()> {
    let mut state = self.state.borrow_mut();
    if !state.remotes.iter().any(|(n, _)| n == name) {
      state.remotes.push((name.to_string(), url.to_string()));
    }
    Ok(())
  }

  fn fetch(&self, _remote: &str, tags: bool) -> RepoResult<()> {
    let mut state = self.state.borrow_mut();
    if tags {
      state.fetch_attempts += 1;
    }
    if state.fetch_failures > 0 {
      state.fetch_failures -= 1;
      return Err(RepoError::Git(GitError::CommandFailed {
        command: "git fetch".to_string(),
        stderr: "fatal: unable to access remote: Connection reset".to_string(),
      }));
    }
    if tags {
      let remote_tags: Vec<_> = state.remote_tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      for (tag, commit) in remote_tags {
        state.tags.entry(tag).or_insert((commit, String::new()));
      }
    }
    state.fetched = true;
    Ok(())
  }

  fn resolve_ref(&self, reference: &str, _remote: &str) -> RepoResult<Option<ResolvedRef>> {
    let state = self.state.borrow();
    let found = |location: RefLocation, commit: &str, is_tag: bool| {
      Some(ResolvedRef {
        name: reference.to_string(),
        location,
        commit: commit.to_string(),
        is_tag,
      })
    };

    if let Some((commit, _)) = state.tags.get(reference) {
      return Ok(found(RefLocation::History, commit, true));
    }
    if state.known_commit(reference) && !state.local_branches.contains_key(reference) {
      return Ok(found(RefLocation::History, reference, false));
    }
    if state.fetched
      && let Some(commit) = state.remote_branches.get(reference)
    {
      return Ok(found(RefLocation::Remote, commit, false));
    }
    if let Some(commit) = state.local_branches.get(reference) {
      return Ok(found(RefLocation::Local, commit, false));
    }
    Ok(None)
  }

  fn resolve_commit(&self, reference: &str) -> RepoResult<String> {
    let state = self.state.borrow();
    let remote = state.remotes.first().map(|(n, _)| n.clone()).unwrap_or_default();
    state
      .lookup(reference, &remote)
      .ok_or_else(|| RepoError::message(format!("unknown revision {}", reference)))
  }

  fn head_ref(&self, _remote: &str) -> RepoResult<String> {
    let state = self.state.borrow();
    match (&state.head_branch, &state.head_commit) {
      (Some(branch), Some(_)) => Ok(branch.clone()),
      (_, None) => Ok(
        state
          .remote_default_branch
          .clone()
          .or_else(|| state.head_branch.clone())
          .unwrap_or_else(|| "master".to_string()),
      ),
      (None, Some(commit)) => Ok(commit.clone()),
    }
  }

  fn checkout(&self, reference: &str, subpath: Option<&str>, force: bool) -> RepoResult<()> {
    let mut state = self.state.borrow_mut();
    if state.blocking_changes && !force {
      return Err(RepoError::Git(GitError::CommandFailed {
        command: format!("git checkout {}", reference),
        stderr: "error: Your local changes to the following files would be overwritten by checkout".to_string(),
      }));
    }

    let remote = state.remotes.first().map(|(n, _)| n.clone()).unwrap_or_default();
    let commit = match state.lookup(reference, &remote) {
      Some(commit) => commit,
      // Checking out a remote-only branch by name creates a tracking branch
      None if state.fetched && state.remote_branches.contains_key(reference) => {
        let commit = state.remote_branches[reference].clone();
        state.local_branches.insert(reference.to_string(), commit.clone());
        commit
      }
      None => {
        return Err(RepoError::Git(GitError::CommandFailed {
          command: format!("git checkout {}", reference),
          stderr: format!("error: pathspec '{}' did not match any file(s) known to git", reference),
        }));
      }
    };

    state
      .checkouts
      .push((reference.to_string(), subpath.map(str::to_string), force));
    if force {
      state.blocking_changes = false;
    }
    if subpath.is_none() {
      state.head_branch = state
        .local_branches
        .contains_key(reference)
        .then(|| reference.to_string());
      state.head_commit = Some(commit);
    }
    Ok(())
  }

  fn reset_hard(&self, reference: &str) -> RepoResult<()> {
    let mut state = self.state.borrow_mut();
    state.resets.push(reference.to_string());
    state.head_commit = Some(reference.to_string());
    if let Some(branch) = state.head_branch.clone() {
      state.local_branches.insert(branch, reference.to_string());
    }
    state.dirty = false;
    state.blocking_changes = false;
    Ok(())
  }

  fn is_dirty(&self) -> RepoResult<bool> {
    Ok(self.state.borrow().dirty)
  }

  fn describe_nearest_tag(&self, _pattern: &str) -> RepoResult<Option<String>> {
    Ok(self.state.borrow().describe.clone())
  }

  fn stage_and_commit(&self, message: &str) -> RepoResult<Option<String>> {
    let mut state = self.state.borrow_mut();
    if !state.dirty {
      return Ok(None);
    }
    let commit = format!("{:040x}", state.commits.len() + 0xc0ffee);
    state.commits.push((commit.clone(), message.to_string()));
    state.head_commit = Some(commit.clone());
    if let Some(branch) = state.head_branch.clone() {
      state.local_branches.insert(branch, commit.clone());
    }
    state.dirty = false;
    Ok(Some(commit))
  }

  fn create_tag(&self, name: &str, reference: &str, message: &str) -> RepoResult<()> {
    let mut state = self.state.borrow_mut();
    if state.tags.contains_key(name) {
      return Err(RepoError::Git(GitError::CommandFailed {
        command: format!("git tag -a {}", name),
        stderr: format!("fatal: tag '{}' already exists", name),
      }));
    }
    let remote = state.remotes.first().map(|(n, _)| n.clone()).unwrap_or_default();
    let commit = state
      .lookup(reference, &remote)
      .ok_or_else(|| RepoError::message(format!("unknown revision {}", reference)))?;
    state.tags.insert(name.to_string(), (commit, message.to_string()));
    Ok(())
  }

  fn tag_exists(&self, name: &str) -> RepoResult<bool> {
    Ok(self.state.borrow().tags.contains_key(name))
  }

  fn push(&self, remote: &str, reference: &str) -> RepoResult<()> {
    self
      .state
      .borrow_mut()
      .pushes
      .push((remote.to_string(), reference.to_string()));
    Ok(())
  }

  fn head_commit(&self) -> RepoResult<String> {
    self
      .state
      .borrow()
      .head_commit
      .clone()
      .ok_or_else(|| RepoError::message("HEAD is unborn"))
  }

  fn current_branch(&self) -> RepoResult<Option<String>> {
    Ok(self.state.borrow().head_branch.clone())
  }
}

/// Hands out one shared `FakeState` per path
#[derive(Debug, Default)]
pub(crate) struct FakeProvider {
  repos: RefCell<HashMap<PathBuf, Rc<RefCell<FakeState>>>>,
}

impl FakeProvider {
  /// State for `path`, created on first use
  pub fn state(&self, path: &Path) -> Rc<RefCell<FakeState>> {
    self.repos.borrow_mut().entry(path.to_path_buf()).or_default().clone()
  }

  fn handle(&self, path: &Path) -> FakeRepo {
    let state = self.state(path);
    let work_tree = state.borrow().work_tree.clone().unwrap_or_else(|| path.to_path_buf());
    FakeRepo { work_tree, state }
  }
}

impl VcsProvider for FakeProvider {
  type Repo = FakeRepo;

  fn ensure_repo(&self, path: &Path) -> RepoResult<FakeRepo> {
    fs::create_dir_all(path)?;
    Ok(self.handle(path))
  }

  fn open_repo(&self, path: &Path) -> RepoResult<FakeRepo> {
    if !self.repos.borrow().contains_key(path) {
      return Err(RepoError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }
    Ok(self.handle(path))
  }
}
