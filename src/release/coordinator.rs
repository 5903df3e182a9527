//! Two-phase release: prepare records intent, perform commits, tags and pushes

use super::changelog;
use super::intent::{ReleaseIntent, release_tag};
use super::lock::ReleaseLock;
use super::version::ReleaseVersion;
use crate::core::context::RepomanContext;
use crate::core::error::{ReleaseError, RepoError, RepoResult, ResultExt};
use crate::core::vcs::{Vcs, VcsProvider};
use crate::manifest::{self, PackageSpec};
use crate::package::Package;
use std::collections::HashSet;
use std::path::PathBuf;

const DEFAULT_COMMIT_MESSAGE: &str = "Prepare release";

/// Inputs to `prepare`
#[derive(Debug, Clone)]
pub struct PrepareRequest {
  pub version: ReleaseVersion,
  /// Tag annotation and changelog text
  pub message: String,
  /// Replaces "Prepare release" in the commit message
  pub commit_message: Option<String>,
  /// Defaults to the configured default remote
  pub remote: Option<String>,
  pub tag_dependencies: bool,
  /// Rewrite the package manifest to the commits checked out in the workspace
  pub pin_dependencies: bool,
}

impl PrepareRequest {
  pub fn new(version: ReleaseVersion, message: impl Into<String>) -> Self {
    Self {
      version,
      message: message.into(),
      commit_message: None,
      remote: None,
      tag_dependencies: true,
      pin_dependencies: false,
    }
  }
}

/// What `perform` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
  pub tag: String,
  /// Commit the tag points to
  pub commit: String,
  pub pushed: bool,
  /// Dependencies carrying the release tag
  pub dependency_tags: Vec<String>,
}

pub struct ReleaseCoordinator<'a, P: VcsProvider> {
  ctx: &'a RepomanContext,
  provider: &'a P,
}

impl<'a, P: VcsProvider> ReleaseCoordinator<'a, P> {
  pub fn new(ctx: &'a RepomanContext, provider: &'a P) -> Self {
    Self { ctx, provider }
  }

  /// Directory holding the intent and the lock
  fn release_dir(&self, package: &Package<P::Repo>) -> PathBuf {
    package.path.join(&self.ctx.config.release.intent_dir)
  }

  fn intent_path(&self, package: &Package<P::Repo>) -> PathBuf {
    ReleaseIntent::path(&package.path, &self.ctx.config.release.intent_dir)
  }

  pub fn commit_message(&self, tag: &str, custom: Option<&str>) -> String {
    format!(
      "{} {} {}",
      self.ctx.config.release.commit_prefix,
      custom.unwrap_or(DEFAULT_COMMIT_MESSAGE),
      tag
    )
  }

  /// Phase 1: check the tree, update release content and persist the intent.
  /// Nothing is committed, tagged or pushed.
  pub fn prepare(&self, package: &Package<P::Repo>, request: &PrepareRequest) -> RepoResult<ReleaseIntent> {
    let _lock = ReleaseLock::acquire(&self.release_dir(package))?;

    if package.repo.is_dirty()? {
      return Err(RepoError::Release(ReleaseError::DirtyWorkingTree {
        package: package.name.clone(),
      }));
    }

    let version = request.version.to_string();
    let tag = release_tag(&package.name, &version);
    let current_ref = package.repo.head_commit()?;

    if let Some(path) = changelog::find_changelog(&package.path, &self.ctx.config.release.changelog_files) {
      changelog::update_changelog(&path, &tag, &request.message)?;
      tracing::info!("Added {} to {}", tag, path.display());
    }

    if request.pin_dependencies {
      self.pin_dependencies(package)?;
    }

    let intent = ReleaseIntent {
      package: package.name.clone(),
      tag: tag.clone(),
      release_version: version,
      release_message: request.message.clone(),
      commit_message: self.commit_message(&tag, request.commit_message.as_deref()),
      remote: request
        .remote
        .clone()
        .unwrap_or_else(|| self.ctx.config.workspace.default_remote.clone()),
      current_ref,
      tag_dependencies: request.tag_dependencies,
    };

    let path = self.intent_path(package);
    intent.save(&path)?;
    tracing::info!("Prepared {} (intent {})", tag, intent.id()?);

    Ok(intent)
  }

  /// Phase 2: commit, tag and optionally push the prepared release
  pub fn perform(&self, package: &Package<P::Repo>, push: bool) -> RepoResult<ReleaseOutcome> {
    let _lock = ReleaseLock::acquire(&self.release_dir(package))?;

    let intent = ReleaseIntent::load(&self.intent_path(package))?.ok_or_else(|| {
      RepoError::Release(ReleaseError::NotPrepared {
        package: package.name.clone(),
      })
    })?;

    if intent.package != package.name {
      return Err(RepoError::Release(ReleaseError::IntentMismatch {
        expected: package.name.clone(),
        found: intent.package,
      }));
    }
    if package.repo.tag_exists(&intent.tag)? {
      return Err(RepoError::Release(ReleaseError::TagExists { tag: intent.tag }));
    }

    tracing::info!("Performing {} (intent {})", intent.tag, intent.id()?);

    let head = package.repo.head_commit()?;
    if head != intent.current_ref {
      tracing::warn!(
        "HEAD of {} moved since prepare ({} -> {})",
        package.name,
        intent.current_ref,
        head
      );
    }

    let commit = match package.repo.stage_and_commit(&intent.commit_message)? {
      Some(commit) => commit,
      None => {
        tracing::info!("Nothing to commit for {}", package.name);
        head
      }
    };

    package.repo.create_tag(&intent.tag, &commit, &intent.release_message)?;
    let tag_ref = format!("refs/tags/{}", intent.tag);
    if push {
      package.repo.push(&intent.remote, &tag_ref)?;
    }

    let dependency_tags = if intent.tag_dependencies {
      self.tag_dependencies(package, &intent, push)?
    } else {
      Vec::new()
    };

    Ok(ReleaseOutcome {
      tag: intent.tag,
      commit,
      pushed: push,
      dependency_tags,
    })
  }

  fn dependency_specs(&self, package: &Package<P::Repo>) -> RepoResult<Vec<PackageSpec>> {
    Ok(
      package
        .read_manifest(&self.ctx.config.workspace.manifest_file)?
        .map(|m| m.specs())
        .unwrap_or_default(),
    )
  }

  fn open_dependency(&self, name: &str) -> RepoResult<P::Repo> {
    let path = self.ctx.root.join(name);
    self
      .provider
      .open_repo(&path)
      .with_context(|| format!("Dependency {} is not checked out at {}", name, path.display()))
  }

  fn pin_dependencies(&self, package: &Package<P::Repo>) -> RepoResult<()> {
    let Some(manifest_path) = package.manifest_path(&self.ctx.config.workspace.manifest_file) else {
      return Ok(());
    };

    let mut pinned = Vec::new();
    for spec in self.dependency_specs(package)? {
      let commit = self.open_dependency(&spec.name)?.head_commit()?;
      pinned.push(spec.with_reference(Some(commit)));
    }

    manifest::update_file(&manifest_path, &pinned)?;
    tracing::info!("Pinned {} dependencies in {}", pinned.len(), manifest_path.display());
    Ok(())
  }

  fn tag_dependencies(
    &self,
    package: &Package<P::Repo>,
    intent: &ReleaseIntent,
    push: bool,
  ) -> RepoResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut tagged = Vec::new();
    let tag_ref = format!("refs/tags/{}", intent.tag);

    for spec in self.dependency_specs(package)? {
      if !seen.insert(spec.name.clone()) {
        tracing::warn!("{} is listed more than once in {}; tagging it once", spec.name, package.name);
        continue;
      }

      let repo = self.open_dependency(&spec.name)?;
      let target = repo.resolve_commit(spec.reference.as_deref().unwrap_or("HEAD"))?;

      if repo.tag_exists(&intent.tag)? {
        let existing = repo.resolve_commit(&tag_ref)?;
        if existing != target {
          return Err(RepoError::with_help(
            format!(
              "{} already has tag {} at {}, expected {}",
              spec.name, intent.tag, existing, target
            ),
            "Delete the stale tag in the dependency or pin it to the tagged commit.",
          ));
        }
        tracing::info!("{} already tagged {}", spec.name, intent.tag);
      } else {
        repo.create_tag(&intent.tag, &target, &intent.release_message)?;
        tracing::info!("Tagged {} at {}", spec.name, target);
      }

      if push {
        repo.push(&intent.remote, &tag_ref)?;
      }
      tagged.push(spec.name);
    }

    Ok(tagged)
  }
}
