use crate::core::error::{ConfigError, RepoError, RepoResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default organisation that hosts package repositories
pub const DEFAULT_REMOTE_BASE: &str = "git@github.com:fermi-lat";

/// Configuration for repoman
/// Searched in order: repoman.toml, .repoman.toml, .config/repoman.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepomanConfig {
  #[serde(default)]
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub fetch: FetchConfig,
  #[serde(default)]
  pub release: ReleaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  /// Base URL (or path) that package names are appended to
  #[serde(default = "default_remote_base")]
  pub remote_base: String,

  /// Appended to `<remote_base>/<package>` (default: ".git")
  #[serde(default = "default_remote_suffix")]
  pub remote_suffix: String,

  /// Name of the remote registered in every package repository
  #[serde(default = "default_remote")]
  pub default_remote: String,

  /// Manifest file looked up inside checked-out packages
  #[serde(default = "default_manifest_file")]
  pub manifest_file: String,
}

fn default_remote_base() -> String {
  DEFAULT_REMOTE_BASE.to_string()
}

fn default_remote_suffix() -> String {
  ".git".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_manifest_file() -> String {
  "packageList.txt".to_string()
}

impl Default for WorkspaceConfig {
  fn default() -> Self {
    Self {
      remote_base: default_remote_base(),
      remote_suffix: default_remote_suffix(),
      default_remote: default_remote(),
      manifest_file: default_manifest_file(),
    }
  }
}

/// Network retry behaviour for fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
  /// Pause before each retry, in milliseconds. A failed fetch is retried once
  /// per entry, so the number of attempts is `len + 1`.
  #[serde(default = "default_retry_delays_ms")]
  pub retry_delays_ms: Vec<u64>,
}

fn default_retry_delays_ms() -> Vec<u64> {
  vec![500, 2500, 5000]
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      retry_delays_ms: default_retry_delays_ms(),
    }
  }
}

impl FetchConfig {
  pub fn retry_delays(&self) -> Vec<Duration> {
    self.retry_delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Directory inside a package that holds the release intent and lock
  #[serde(default = "default_intent_dir")]
  pub intent_dir: PathBuf,

  /// Prefix of generated release commit messages
  #[serde(default = "default_commit_prefix")]
  pub commit_prefix: String,

  /// Changelog candidates, first existing file wins
  #[serde(default = "default_changelog_files")]
  pub changelog_files: Vec<String>,
}

fn default_intent_dir() -> PathBuf {
  PathBuf::from("target").join("repoman")
}

fn default_commit_prefix() -> String {
  "[repoman-release]".to_string()
}

fn default_changelog_files() -> Vec<String> {
  vec!["CHANGELOG.md".to_string(), "CHANGELOG".to_string(), "ChangeLog".to_string()]
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      intent_dir: default_intent_dir(),
      commit_prefix: default_commit_prefix(),
      changelog_files: default_changelog_files(),
    }
  }
}

impl RepomanConfig {
  /// Find config file in search order: repoman.toml, .repoman.toml, .config/repoman.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("repoman.toml"),
      path.join(".repoman.toml"),
      path.join(".config").join("repoman.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the workspace root, falling back to defaults when no
  /// file exists
  pub fn load(path: &Path) -> RepoResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!("No repoman.toml under {}, using defaults", path.display());
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: RepomanConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate(&config_path)?;
    tracing::debug!("Loaded configuration from {}", config_path.display());

    Ok(config)
  }

  /// Validate loaded values
  pub fn validate(&self, source: &Path) -> RepoResult<()> {
    let invalid = |reason: String| {
      RepoError::Config(ConfigError::Invalid {
        path: source.to_path_buf(),
        reason,
      })
    };

    if self.workspace.remote_base.trim().is_empty() {
      return Err(invalid("workspace.remote_base must not be empty".to_string()));
    }
    if self.workspace.default_remote.trim().is_empty() || self.workspace.default_remote.contains(char::is_whitespace) {
      return Err(invalid(format!(
        "workspace.default_remote '{}' is not a valid remote name",
        self.workspace.default_remote
      )));
    }
    if self.workspace.manifest_file.is_empty() || self.workspace.manifest_file.contains('/') {
      return Err(invalid(format!(
        "workspace.manifest_file '{}' must be a plain file name",
        self.workspace.manifest_file
      )));
    }
    if self.release.intent_dir.is_absolute() {
      return Err(invalid("release.intent_dir must be relative to the package".to_string()));
    }

    Ok(())
  }
}
