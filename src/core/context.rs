//! Explicit workspace context - build once, pass everywhere
//!
//! `RepomanContext` carries the workspace root and the loaded configuration.
//! It is built in main.rs and handed to the checkout engine and the release
//! coordinator at construction, so neither reads process-global state.

use crate::core::config::RepomanConfig;
use crate::core::error::RepoResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Workspace-level data shared by every operation of one invocation.
#[derive(Debug, Clone)]
pub struct RepomanContext {
  /// Workspace root directory (absolute path)
  pub root: PathBuf,

  /// Configuration (repoman.toml merged with CLI overrides)
  pub config: Arc<RepomanConfig>,
}

impl RepomanContext {
  /// Build the context for a workspace root, loading repoman.toml if present.
  pub fn build(workspace_root: &Path) -> RepoResult<Self> {
    let root = absolute(workspace_root)?;
    let config = RepomanConfig::load(&root)?;
    Ok(Self::new(root, config))
  }

  pub fn new(root: PathBuf, config: RepomanConfig) -> Self {
    Self {
      root,
      config: Arc::new(config),
    }
  }

  /// Override the remote base (e.g. from `--remote-base` or `REMOTE_BASE`)
  pub fn with_remote_base(mut self, remote_base: impl Into<String>) -> Self {
    Arc::make_mut(&mut self.config).workspace.remote_base = remote_base.into();
    self
  }

  /// Remote URL for a package: `<remote_base>/<name><suffix>`
  pub fn remote_url(&self, package: &str) -> String {
    let ws = &self.config.workspace;
    let base = ws.remote_base.as_str();
    if base.ends_with('/') || base.ends_with(':') {
      format!("{}{}{}", base, package, ws.remote_suffix)
    } else {
      format!("{}/{}{}", base, package, ws.remote_suffix)
    }
  }
}

fn absolute(path: &Path) -> RepoResult<PathBuf> {
  if path.is_absolute() {
    Ok(path.to_path_buf())
  } else {
    Ok(std::env::current_dir()?.join(path))
  }
}
