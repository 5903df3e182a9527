//! Version-control adapter contract
//!
//! The checkout engine and the release coordinator only talk to repositories
//! through [`Vcs`] handles obtained from a [`VcsProvider`]. `SystemGit` is the
//! production backend; tests substitute an in-memory fake.

pub mod system_git;
mod system_git_ops;

#[cfg(test)]
pub(crate) mod fake;

pub use system_git::{SystemGit, SystemGitProvider};

use crate::core::error::RepoResult;
use std::path::Path;

/// Where a candidate ref was found, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefLocation {
  /// A tag or commit id already present in history
  History,
  /// A branch known only through the remote-tracking refs
  Remote,
  /// A branch that exists only locally
  Local,
}

/// A candidate ref that resolved to a real commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
  /// The ref as the caller spelled it
  pub name: String,
  pub location: RefLocation,
  pub commit: String,
  pub is_tag: bool,
}

/// Operations the core needs from one repository
pub trait Vcs {
  /// Root of the working tree this handle operates on
  fn work_tree(&self) -> &Path;

  /// Register `name -> url` unless a remote with that name exists
  fn ensure_remote(&self, name: &str, url: &str) -> RepoResult<()>;

  /// Fetch refs (or, with `tags`, all tags) from a remote.
  /// Every failure is treated as transient by callers.
  fn fetch(&self, remote: &str, tags: bool) -> RepoResult<()>;

  /// Resolve a candidate ref, preferring history, then the remote, then local branches
  fn resolve_ref(&self, reference: &str, remote: &str) -> RepoResult<Option<ResolvedRef>>;

  /// Commit id a ref points to
  fn resolve_commit(&self, reference: &str) -> RepoResult<String>;

  /// The repository's current head reference; for a freshly initialized
  /// repository this is the remote's default branch
  fn head_ref(&self, remote: &str) -> RepoResult<String>;

  /// Check out `reference`, optionally only `subpath`
  fn checkout(&self, reference: &str, subpath: Option<&str>, force: bool) -> RepoResult<()>;

  /// Make the working tree match `reference` exactly
  fn reset_hard(&self, reference: &str) -> RepoResult<()>;

  /// True when tracked files have uncommitted modifications
  fn is_dirty(&self) -> RepoResult<bool>;

  /// Nearest tag reachable from HEAD that matches a glob, in `git describe` form
  fn describe_nearest_tag(&self, pattern: &str) -> RepoResult<Option<String>>;

  /// Stage modified tracked files and commit them; `None` when nothing changed
  fn stage_and_commit(&self, message: &str) -> RepoResult<Option<String>>;

  /// Create an annotated tag
  fn create_tag(&self, name: &str, reference: &str, message: &str) -> RepoResult<()>;

  fn tag_exists(&self, name: &str) -> RepoResult<bool>;

  fn push(&self, remote: &str, reference: &str) -> RepoResult<()>;

  fn head_commit(&self) -> RepoResult<String>;

  /// Current branch, `None` when HEAD is detached
  fn current_branch(&self) -> RepoResult<Option<String>>;
}

/// Factory for repository handles
pub trait VcsProvider {
  type Repo: Vcs;

  /// Open the repository at `path`, initializing an empty one if the
  /// directory is missing or empty
  fn ensure_repo(&self, path: &Path) -> RepoResult<Self::Repo>;

  /// Open an existing repository
  fn open_repo(&self, path: &Path) -> RepoResult<Self::Repo>;
}
