//! `MM-mm-pp` release versions

use crate::core::error::{ReleaseError, RepoError, RepoResult};
use crate::core::vcs::Vcs;
use crate::package::Package;
use std::fmt;
use std::str::FromStr;

/// A release version, optionally followed by a `git describe` style suffix
/// (`01-02-03-4-gabc1234`) when commits follow the tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
  pub suffix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
  Major,
  Minor,
  Patch,
}

impl ReleaseVersion {
  pub fn new(major: u32, minor: u32, patch: u32) -> Self {
    Self {
      major,
      minor,
      patch,
      suffix: None,
    }
  }

  /// The next version; the suffix is dropped
  pub fn bump(&self, bump: VersionBump) -> Self {
    match bump {
      VersionBump::Major => Self::new(self.major + 1, 0, 0),
      VersionBump::Minor => Self::new(self.major, self.minor + 1, 0),
      VersionBump::Patch => Self::new(self.major, self.minor, self.patch + 1),
    }
  }
}

impl FromStr for ReleaseVersion {
  type Err = RepoError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || {
      RepoError::Release(ReleaseError::InvalidVersion {
        version: s.to_string(),
      })
    };

    let mut parts = s.splitn(4, '-');
    let mut field = || -> RepoResult<u32> {
      let part = parts.next().ok_or_else(invalid)?;
      if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
      }
      part.parse().map_err(|_| invalid())
    };

    let major = field()?;
    let minor = field()?;
    let patch = field()?;
    let suffix = match parts.next() {
      Some("") => return Err(invalid()),
      other => other.map(str::to_string),
    };

    Ok(Self {
      major,
      minor,
      patch,
      suffix,
    })
  }
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}-{:02}-{:02}", self.major, self.minor, self.patch)?;
    if let Some(suffix) = &self.suffix {
      write!(f, "-{}", suffix)?;
    }
    Ok(())
  }
}

/// Version the next release of `package` should carry.
///
/// Starts from the nearest `name-*` tag. Without a bump, HEAD must have moved
/// past that tag, in which case the patch level goes up.
pub fn resolve_next_version<R: Vcs>(package: &Package<R>, bump: Option<VersionBump>) -> RepoResult<ReleaseVersion> {
  let described = package.describe_version()?.ok_or_else(|| {
    RepoError::Release(ReleaseError::NoTag {
      package: package.name.clone(),
    })
  })?;
  let current: ReleaseVersion = described.parse()?;

  match (bump, &current.suffix) {
    (Some(bump), _) => Ok(current.bump(bump)),
    (None, Some(_)) => Ok(current.bump(VersionBump::Patch)),
    (None, None) => Err(RepoError::Release(ReleaseError::NothingToBump {
      package: package.name.clone(),
      version: current.to_string(),
    })),
  }
}
