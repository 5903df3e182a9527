//! `repoman release`, `release-prepare` and `release-perform`

use crate::core::context::RepomanContext;
use crate::core::error::{RepoError, RepoResult};
use crate::core::vcs::{SystemGit, SystemGitProvider, VcsProvider};
use crate::package::Package;
use crate::release::{
  PrepareRequest, ReleaseCoordinator, ReleaseIntent, ReleaseOutcome, VersionBump, resolve_next_version,
};
use clap::Args;

#[derive(Debug, Args)]
#[group(required = false, multiple = false)]
pub struct BumpArgs {
  /// Bump the major version
  #[arg(long)]
  pub major: bool,

  /// Bump the minor version
  #[arg(long)]
  pub minor: bool,

  /// Bump the patch version
  #[arg(long)]
  pub patch: bool,
}

impl BumpArgs {
  pub fn bump(&self) -> Option<VersionBump> {
    if self.major {
      Some(VersionBump::Major)
    } else if self.minor {
      Some(VersionBump::Minor)
    } else if self.patch {
      Some(VersionBump::Patch)
    } else {
      None
    }
  }
}

#[derive(Debug, Args)]
pub struct PrepareArgs {
  /// Package to release (must be checked out in the workspace)
  pub package: String,

  /// Release message, used for the tag annotation and the changelog
  pub message: String,

  #[command(flatten)]
  pub bump: BumpArgs,

  /// Replaces "Prepare release" in the release commit message
  #[arg(long, value_name = "MESSAGE")]
  pub commit_message: Option<String>,

  /// Remote the release is pushed to (default: the configured remote)
  #[arg(long)]
  pub remote: Option<String>,

  /// Do not tag the packages listed in the package list
  #[arg(long)]
  pub no_tag_dependencies: bool,

  /// Pin every listed dependency to the commit checked out in the workspace
  #[arg(long)]
  pub pin_dependencies: bool,
}

#[derive(Debug, Args)]
pub struct PerformArgs {
  /// Package whose prepared release is performed
  pub package: String,

  /// Create the tags locally without pushing
  #[arg(long)]
  pub no_push: bool,
}

#[derive(Debug, Args)]
pub struct ReleaseArgs {
  #[command(flatten)]
  pub prepare: PrepareArgs,

  /// Create the tags locally without pushing
  #[arg(long)]
  pub no_push: bool,
}

fn open_package(ctx: &RepomanContext, name: &str) -> RepoResult<Package<SystemGit>> {
  let path = ctx.root.join(name);
  if !path.is_dir() {
    return Err(RepoError::with_help(
      format!("Package {} is not checked out at {}", name, path.display()),
      format!("Run `repoman checkout {}` first.", name),
    ));
  }
  let repo = SystemGitProvider.open_repo(&path)?;
  Ok(Package::new(name, path, repo))
}

/// Phase 1 only
pub fn run_prepare(ctx: &RepomanContext, args: &PrepareArgs) -> RepoResult<()> {
  let package = open_package(ctx, &args.package)?;
  let intent = prepare(ctx, &package, args)?;

  println!();
  println!("Next steps:");
  println!("  repoman release-perform {}", intent.package);
  Ok(())
}

/// Phase 2 only
pub fn run_perform(ctx: &RepomanContext, args: &PerformArgs) -> RepoResult<()> {
  let package = open_package(ctx, &args.package)?;
  perform(ctx, &package, !args.no_push)?;
  Ok(())
}

/// Both phases back to back
pub fn run_release(ctx: &RepomanContext, args: &ReleaseArgs) -> RepoResult<()> {
  let package = open_package(ctx, &args.prepare.package)?;
  prepare(ctx, &package, &args.prepare)?;
  println!();
  perform(ctx, &package, !args.no_push)?;
  Ok(())
}

fn prepare(ctx: &RepomanContext, package: &Package<SystemGit>, args: &PrepareArgs) -> RepoResult<ReleaseIntent> {
  let version = resolve_next_version(package, args.bump.bump())?;
  let request = PrepareRequest {
    version,
    message: args.message.clone(),
    commit_message: args.commit_message.clone(),
    remote: args.remote.clone(),
    tag_dependencies: !args.no_tag_dependencies,
    pin_dependencies: args.pin_dependencies,
  };

  let provider = SystemGitProvider;
  let intent = ReleaseCoordinator::new(ctx, &provider).prepare(package, &request)?;

  println!("📝 Prepared release {} ({})", intent.tag, intent.id()?);
  println!("   Version: {}", intent.release_version);
  println!("   Commit:  {}", intent.commit_message);
  println!("   Remote:  {}", intent.remote);
  if intent.tag_dependencies {
    println!("   Dependencies will be tagged {}", intent.tag);
  }
  Ok(intent)
}

fn perform(ctx: &RepomanContext, package: &Package<SystemGit>, push: bool) -> RepoResult<ReleaseOutcome> {
  let provider = SystemGitProvider;
  let outcome = ReleaseCoordinator::new(ctx, &provider).perform(package, push)?;

  println!("   Created tag: {} at {}", outcome.tag, &outcome.commit[..12.min(outcome.commit.len())]);
  for dep in &outcome.dependency_tags {
    println!("   Tagged dependency: {}", dep);
  }
  println!();
  if outcome.pushed {
    println!("✅ Release {} completed and pushed!", outcome.tag);
  } else {
    println!("✅ Release {} completed (not pushed)", outcome.tag);
  }
  Ok(outcome)
}
