//! A checked-out package: name, working tree and VCS handle

use crate::core::error::RepoResult;
use crate::core::vcs::Vcs;
use crate::manifest::{self, Manifest};
use std::path::PathBuf;

/// Created fresh per invocation; never cached across operations.
#[derive(Debug)]
pub struct Package<R: Vcs> {
  pub name: String,
  pub path: PathBuf,
  pub repo: R,
}

impl<R: Vcs> Package<R> {
  pub fn new(name: impl Into<String>, path: PathBuf, repo: R) -> Self {
    Self {
      name: name.into(),
      path,
      repo,
    }
  }

  /// Glob matching this package's release tags. The digit keeps out tags of
  /// packages named `<name>-<suffix>` that dependency tagging leaves here.
  pub fn tag_pattern(&self) -> String {
    format!("{}-[0-9]*", self.name)
  }

  /// Nearest release tag reachable from HEAD with the `name-` prefix removed,
  /// e.g. `01-02-03` or `01-02-03-4-gabc1234` when commits follow the tag
  pub fn describe_version(&self) -> RepoResult<Option<String>> {
    let prefix = format!("{}-", self.name);
    let described = self.repo.describe_nearest_tag(&self.tag_pattern())?;
    Ok(described.map(|d| d.strip_prefix(&prefix).map(str::to_string).unwrap_or(d)))
  }

  pub fn manifest_path(&self, file_name: &str) -> Option<PathBuf> {
    manifest::find_manifest(&self.path, file_name)
  }

  /// The package's own manifest, if it declares dependencies
  pub fn read_manifest(&self, file_name: &str) -> RepoResult<Option<Manifest>> {
    self.manifest_path(file_name).map(|path| Manifest::read(&path)).transpose()
  }
}
