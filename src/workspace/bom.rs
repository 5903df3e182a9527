//! Bill of materials: what each checked-out package resolved to

use crate::core::error::{RepoResult, ResultExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Resolved state of one package after checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedState {
  pub commit: String,
  pub tag: Option<String>,
  pub branch: Option<String>,
}

/// Package name -> resolved state, in order of first checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillOfMaterials {
  entries: IndexMap<String, ResolvedState>,
}

impl BillOfMaterials {
  /// Record a package. Re-recording keeps the original position.
  pub fn record(&mut self, package: impl Into<String>, state: ResolvedState) {
    self.entries.insert(package.into(), state);
  }

  pub fn get(&self, package: &str) -> Option<&ResolvedState> {
    self.entries.get(package)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedState)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn to_json(&self) -> RepoResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn write_json(&self, path: &Path) -> RepoResult<()> {
    let json = self.to_json()?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write bill of materials to {}", path.display()))
  }
}
