//! Package specification: which package, which part of it, at which ref

use crate::core::error::{RepoError, RepoResult};
use std::fmt;

/// A package to check out, optionally restricted to a subpath and pinned to a ref.
///
/// Identity is `(name, subpath)`; the composite key `name[/subpath]` encodes
/// it losslessly because `name` never contains `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
  pub name: String,
  pub subpath: Option<String>,
  /// Tag, branch or commit. `None` means the repository's current head.
  pub reference: Option<String>,
}

impl PackageSpec {
  pub fn new(name: impl Into<String>, subpath: Option<String>, reference: Option<String>) -> RepoResult<Self> {
    let name = name.into();
    if name.is_empty() {
      return Err(RepoError::message("Package name must not be empty"));
    }
    if name.contains('/') {
      return Err(RepoError::message(format!("Package name '{}' must not contain '/'", name)));
    }
    if subpath.as_deref().is_some_and(str::is_empty) {
      return Err(RepoError::message(format!("Empty subpath for package '{}'", name)));
    }

    Ok(Self {
      name,
      subpath,
      reference,
    })
  }

  /// Decode `name[/subpath]`; the first segment is the name
  pub fn parse_key(key: &str, reference: Option<String>) -> RepoResult<Self> {
    match key.split_once('/') {
      Some((name, subpath)) => Self::new(name, Some(subpath.to_string()), reference),
      None => Self::new(key, None, reference),
    }
  }

  /// Composite key `name[/subpath]`
  pub fn key(&self) -> String {
    match &self.subpath {
      Some(subpath) => format!("{}/{}", self.name, subpath),
      None => self.name.clone(),
    }
  }

  /// Same package, different ref
  pub fn with_reference(&self, reference: Option<String>) -> Self {
    Self {
      reference,
      ..self.clone()
    }
  }
}

impl fmt::Display for PackageSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.reference {
      Some(reference) => write!(f, "{} {}", self.key(), reference),
      None => write!(f, "{}", self.key()),
    }
  }
}
