//! Persisted release intent
//!
//! `release-prepare` records everything `release-perform` needs in
//! `<package>/<intent_dir>/release.json`, so the two phases can run in
//! separate processes and a crashed perform can be re-run.

use crate::core::error::{RepoError, RepoResult, ResultExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const INTENT_FILE: &str = "release.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseIntent {
  pub package: String,
  /// Always `<package>-<release_version>`
  pub tag: String,
  pub release_version: String,
  /// Annotation of the release tag(s)
  pub release_message: String,
  pub commit_message: String,
  pub remote: String,
  /// HEAD commit at prepare time
  pub current_ref: String,
  pub tag_dependencies: bool,
}

/// Short content hash identifying an intent in output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentId(String);

impl IntentId {
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Self(format!("{:x}", hasher.finalize()))
  }

  /// First 12 hex digits
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for IntentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Tag name for a package release
pub fn release_tag(package: &str, version: &str) -> String {
  format!("{}-{}", package, version)
}

impl ReleaseIntent {
  pub fn path(package_dir: &Path, intent_dir: &Path) -> PathBuf {
    package_dir.join(intent_dir).join(INTENT_FILE)
  }

  pub fn id(&self) -> RepoResult<IntentId> {
    Ok(IntentId::from_contents(&serde_json::to_vec(self)?))
  }

  /// Load the intent, `None` if no release has been prepared
  pub fn load(path: &Path) -> RepoResult<Option<Self>> {
    if !path.exists() {
      return Ok(None);
    }

    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read release intent {}", path.display()))?;
    let intent: ReleaseIntent =
      serde_json::from_str(&content).with_context(|| format!("Corrupt release intent {}", path.display()))?;

    if intent.tag != release_tag(&intent.package, &intent.release_version) {
      return Err(RepoError::with_help(
        format!(
          "Release intent {} is inconsistent: tag '{}' does not match {} {}",
          path.display(),
          intent.tag,
          intent.package,
          intent.release_version
        ),
        "Run release-prepare again to rewrite it.",
      ));
    }

    Ok(Some(intent))
  }

  /// Write the intent, replacing any earlier one
  pub fn save(&self, path: &Path) -> RepoResult<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(self)?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write release intent {}", path.display()))
  }
}
