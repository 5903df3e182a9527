//! Checkout engine
//!
//! A [`Workspace`] owns a root directory and turns package specs into
//! checked-out working trees under it:
//!
//! 1. locate (or initialize) the working tree at `root/<name>`
//! 2. register the default remote
//! 3. fetch tags and refs, once per package per session, with retries
//! 4. pick the ref to check out from the candidate list
//! 5. check it out (optionally only a subpath), hard-resetting when forced
//! 6. record what was checked out in the bill of materials
//!
//! Packages whose working tree contains a manifest can be expanded
//! recursively with [`Workspace::checkout_recursive`].

mod bom;
mod retry;

pub use bom::{BillOfMaterials, ResolvedState};
pub use retry::{RetryExhausted, RetryPolicy};

use crate::core::context::RepomanContext;
use crate::core::error::{RepoError, RepoResult, WorkspaceError, diagnostic_of};
use crate::core::vcs::{RefLocation, Vcs, VcsProvider};
use crate::manifest::PackageSpec;
use crate::package::Package;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs for a checkout
#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
  /// Preferred refs, tried before the package's own ref
  pub refs: Vec<String>,
  /// Throw away local changes
  pub force: bool,
  /// Check out into the workspace root instead of `root/<name>`
  pub in_place: bool,
  /// Remove the package directory first
  pub clobber: bool,
  /// Drop refs from nested manifests and follow each repository's head
  pub ignore_pins: bool,
}

/// What step 4 settled on
struct Target {
  reference: String,
  is_tag: bool,
  /// Commit the ref resolved to; a remote branch resolves to its
  /// remote-tracking commit, not a stale local branch of the same name
  commit: Option<String>,
}

pub struct Workspace<P: VcsProvider> {
  ctx: RepomanContext,
  provider: P,
  /// Packages fetched successfully during this session
  fetched: HashSet<String>,
  bom: BillOfMaterials,
  retry: RetryPolicy,
}

impl<P: VcsProvider> Workspace<P> {
  pub fn new(ctx: RepomanContext, provider: P) -> Self {
    let retry = RetryPolicy::new(ctx.config.fetch.retry_delays());
    Self {
      ctx,
      provider,
      fetched: HashSet::new(),
      bom: BillOfMaterials::default(),
      retry,
    }
  }

  pub fn context(&self) -> &RepomanContext {
    &self.ctx
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn bom(&self) -> &BillOfMaterials {
    &self.bom
  }

  /// Directory a package is checked out into
  pub fn package_dir(&self, name: &str, in_place: bool) -> PathBuf {
    if in_place {
      self.ctx.root.clone()
    } else {
      self.ctx.root.join(name)
    }
  }

  /// Check out a single package
  pub fn checkout(&mut self, spec: &PackageSpec, options: &CheckoutOptions) -> RepoResult<Package<P::Repo>> {
    let path = self.package_dir(&spec.name, options.in_place);
    let remote = self.ctx.config.workspace.default_remote.clone();
    let remote_url = self.ctx.remote_url(&spec.name);

    if options.clobber {
      self.clobber(&spec.name, &path, options.in_place)?;
    }

    let repo = self.provider.ensure_repo(&path)?;
    verify_work_tree(&spec.name, &path, repo.work_tree())?;

    repo.ensure_remote(&remote, &remote_url)?;
    self.fetch(&spec.name, &repo, &remote, &remote_url)?;

    let target = resolve_target(&repo, spec, options, &remote)?;
    let subpath = spec.subpath.as_deref();
    tracing::info!("Checking out {} at {}", spec.key(), target.reference);

    let checkout_failed = |err: RepoError| {
      RepoError::Workspace(WorkspaceError::CheckoutFailed {
        package: spec.name.clone(),
        remote_url: remote_url.clone(),
        reference: target.reference.clone(),
        diagnostic: diagnostic_of(&err),
      })
    };

    repo
      .checkout(&target.reference, subpath, options.force)
      .map_err(checkout_failed)?;

    let reset = options.force && subpath.is_none();
    let commit = match target.commit.as_ref().filter(|_| reset) {
      Some(upstream) => upstream.clone(),
      None => repo.resolve_commit(&target.reference).map_err(checkout_failed)?,
    };
    if reset {
      repo.reset_hard(&commit).map_err(checkout_failed)?;
    }

    let branch = match subpath {
      Some(_) => None,
      None => repo.current_branch()?,
    };
    self.bom.record(
      spec.name.clone(),
      ResolvedState {
        commit,
        tag: target.is_tag.then(|| target.reference.clone()),
        branch,
      },
    );

    Ok(Package::new(spec.name.clone(), path, repo))
  }

  /// Check out every spec in order, stopping at the first failure
  pub fn checkout_packages(
    &mut self,
    specs: &[PackageSpec],
    options: &CheckoutOptions,
  ) -> RepoResult<Vec<Package<P::Repo>>> {
    self.checkout_packages_with(specs, options, |_, _| {})
  }

  /// Like [`Workspace::checkout_packages`], calling `progress` with the
  /// number of finished packages after each one
  pub fn checkout_packages_with<F>(
    &mut self,
    specs: &[PackageSpec],
    options: &CheckoutOptions,
    mut progress: F,
  ) -> RepoResult<Vec<Package<P::Repo>>>
  where
    F: FnMut(usize, &Package<P::Repo>),
  {
    let mut packages = Vec::with_capacity(specs.len());
    for spec in specs {
      let package = self.checkout(spec, options)?;
      progress(packages.len() + 1, &package);
      packages.push(package);
    }
    Ok(packages)
  }

  /// Check out a package and, depth first, everything its manifest lists.
  ///
  /// A package key seen earlier in the same call is skipped, which also
  /// breaks dependency cycles.
  pub fn checkout_recursive(
    &mut self,
    spec: &PackageSpec,
    options: &CheckoutOptions,
  ) -> RepoResult<Vec<Package<P::Repo>>> {
    let mut visited = HashSet::new();
    let mut packages = Vec::new();
    self.expand(spec, options, &mut visited, &mut packages)?;
    Ok(packages)
  }

  fn expand(
    &mut self,
    spec: &PackageSpec,
    options: &CheckoutOptions,
    visited: &mut HashSet<String>,
    packages: &mut Vec<Package<P::Repo>>,
  ) -> RepoResult<()> {
    if !visited.insert(spec.key()) {
      tracing::warn!("Skipping {}: already checked out in this run", spec.key());
      return Ok(());
    }

    let package = self.checkout(spec, options)?;
    let manifest = package.read_manifest(&self.ctx.config.workspace.manifest_file)?;
    packages.push(package);

    let Some(manifest) = manifest else {
      return Ok(());
    };

    let nested = CheckoutOptions {
      in_place: false,
      clobber: false,
      ..options.clone()
    };
    for dep in manifest.specs() {
      let dep = if options.ignore_pins { dep.with_reference(None) } else { dep };
      self.expand(&dep, &nested, visited, packages)?;
    }
    Ok(())
  }

  fn clobber(&self, name: &str, path: &Path, in_place: bool) -> RepoResult<()> {
    if in_place {
      return Err(RepoError::Workspace(WorkspaceError::Clobber {
        package: name.to_string(),
        path: path.to_path_buf(),
      }));
    }
    if path.is_dir() {
      tracing::info!("Removing {}", path.display());
      fs::remove_dir_all(path)?;
    }
    Ok(())
  }

  fn fetch(&mut self, name: &str, repo: &P::Repo, remote: &str, remote_url: &str) -> RepoResult<()> {
    if self.fetched.contains(name) {
      tracing::debug!("{} already fetched in this session", name);
      return Ok(());
    }

    tracing::info!("Fetching {} from {}", name, remote_url);
    self
      .retry
      .run(|| {
        repo.fetch(remote, true)?;
        repo.fetch(remote, false)
      })
      .map_err(|exhausted| {
        RepoError::Workspace(WorkspaceError::FetchFailed {
          package: name.to_string(),
          remote_url: remote_url.to_string(),
          attempts: exhausted.attempts,
          diagnostic: diagnostic_of(&exhausted.last_error),
        })
      })?;

    self.fetched.insert(name.to_string());
    Ok(())
  }
}

/// The repository must be rooted exactly at the package directory, not merely
/// nested inside some other working tree
fn verify_work_tree(name: &str, expected: &Path, found: &Path) -> RepoResult<()> {
  let canonical = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
  if canonical(expected) != canonical(found) {
    return Err(RepoError::Workspace(WorkspaceError::NotWorkTree {
      package: name.to_string(),
      path: expected.to_path_buf(),
      found: found.to_path_buf(),
    }));
  }
  Ok(())
}

fn resolve_target<R: Vcs>(
  repo: &R,
  spec: &PackageSpec,
  options: &CheckoutOptions,
  remote: &str,
) -> RepoResult<Target> {
  if options.refs.is_empty()
    && let Some(reference) = &spec.reference
  {
    let resolved = repo.resolve_ref(reference, remote)?;
    return Ok(Target {
      reference: checkout_name(reference, resolved.as_ref().map(|r| r.location), spec, remote),
      is_tag: resolved.as_ref().is_some_and(|r| r.is_tag),
      commit: resolved.map(|r| r.commit),
    });
  }

  let candidates = options.refs.iter().chain(spec.reference.iter());
  for candidate in candidates {
    if let Some(resolved) = repo.resolve_ref(candidate, remote)? {
      tracing::debug!("{}: '{}' resolved to {}", spec.name, candidate, resolved.commit);
      return Ok(Target {
        reference: checkout_name(candidate, Some(resolved.location), spec, remote),
        is_tag: resolved.is_tag,
        commit: Some(resolved.commit),
      });
    }
    tracing::debug!("{}: '{}' not found", spec.name, candidate);
  }

  let head = repo.head_ref(remote)?;
  tracing::debug!("{}: no candidate ref found, using {}", spec.name, head);
  let commit = repo.resolve_ref(&head, remote)?.map(|r| r.commit);
  Ok(Target {
    reference: head,
    is_tag: false,
    commit,
  })
}

/// A remote-only branch can't be named bare in a path-limited checkout
fn checkout_name(reference: &str, location: Option<RefLocation>, spec: &PackageSpec, remote: &str) -> String {
  match location {
    Some(RefLocation::Remote) if spec.subpath.is_some() => format!("{}/{}", remote, reference),
    _ => reference.to_string(),
  }
}
