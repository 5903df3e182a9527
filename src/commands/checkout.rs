//! `repoman checkout` and `repoman checkout-list`

use crate::core::context::RepomanContext;
use crate::core::error::RepoResult;
use crate::core::vcs::SystemGitProvider;
use crate::manifest::{Manifest, PackageSpec};
use crate::ui::CheckoutProgress;
use crate::workspace::{CheckoutOptions, Workspace};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CheckoutArgs {
  /// Package to check out, optionally `<package>/<subpath>`
  pub package: String,

  /// Tag, branch or commit (default: the repository's head)
  pub reference: Option<String>,

  /// Throw away local changes in the package
  #[arg(long)]
  pub force: bool,

  /// Remove the package directory before checking out
  #[arg(long, conflicts_with = "in_place")]
  pub clobber: bool,

  /// Check out into the workspace directory itself
  #[arg(long)]
  pub in_place: bool,

  /// Ignore refs in nested package lists and follow each repository's head
  #[arg(long, visible_alias = "master")]
  pub ignore_pins: bool,

  /// Preferred ref, tried before the package's own (repeatable)
  #[arg(long = "prefer", value_name = "REF")]
  pub prefer: Vec<String>,

  /// Write the bill of materials as JSON
  #[arg(long, value_name = "PATH")]
  pub bom: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckoutListArgs {
  /// Package list to check out
  pub package_list: PathBuf,

  /// Throw away local changes in the packages
  #[arg(long)]
  pub force: bool,

  /// Ignore refs in the package list and follow each repository's head
  #[arg(long, visible_alias = "master")]
  pub ignore_pins: bool,

  /// Preferred ref, tried before each package's own (repeatable)
  #[arg(long = "prefer", value_name = "REF")]
  pub prefer: Vec<String>,

  /// Write the bill of materials as JSON
  #[arg(long, value_name = "PATH")]
  pub bom: Option<PathBuf>,
}

/// Check out one package and everything its package list names
pub fn run_checkout(ctx: &RepomanContext, args: &CheckoutArgs) -> RepoResult<()> {
  let spec = PackageSpec::parse_key(&args.package, args.reference.clone())?;
  let options = CheckoutOptions {
    refs: args.prefer.clone(),
    force: args.force,
    in_place: args.in_place,
    clobber: args.clobber,
    ignore_pins: args.ignore_pins,
  };

  println!("📦 Checking out {} into {}", spec, ctx.root.display());

  let mut workspace = Workspace::new(ctx.clone(), SystemGitProvider);
  let packages = workspace.checkout_recursive(&spec, &options)?;

  finish(&workspace, packages.len(), args.bom.as_ref())
}

/// Check out every package in a package list
pub fn run_checkout_list(ctx: &RepomanContext, args: &CheckoutListArgs) -> RepoResult<()> {
  let manifest = Manifest::read(&args.package_list)?;
  let specs: Vec<PackageSpec> = manifest
    .specs()
    .into_iter()
    .map(|spec| if args.ignore_pins { spec.with_reference(None) } else { spec })
    .collect();

  if specs.is_empty() {
    println!("⚠️  No packages listed in {}", args.package_list.display());
    return Ok(());
  }

  let options = CheckoutOptions {
    refs: args.prefer.clone(),
    force: args.force,
    ignore_pins: args.ignore_pins,
    ..Default::default()
  };

  println!("📦 Checking out {} package(s) into {}", specs.len(), ctx.root.display());

  let mut workspace = Workspace::new(ctx.clone(), SystemGitProvider);
  let packages = if specs.len() > 1 {
    let mut progress = CheckoutProgress::new(specs.len(), "Checking out");
    workspace.checkout_packages_with(&specs, &options, |done, _| progress.set(done))?
  } else {
    workspace.checkout_packages(&specs, &options)?
  };

  finish(&workspace, packages.len(), args.bom.as_ref())
}

fn finish(workspace: &Workspace<SystemGitProvider>, count: usize, bom: Option<&PathBuf>) -> RepoResult<()> {
  println!();
  for (name, state) in workspace.bom().iter() {
    let at = state
      .tag
      .as_deref()
      .or(state.branch.as_deref())
      .unwrap_or("detached");
    println!("   {:<24} {} ({})", name, short(&state.commit), at);
  }

  if let Some(path) = bom {
    workspace.bom().write_json(path)?;
    println!("   Wrote bill of materials to {}", path.display());
  }

  println!();
  println!("✅ Checked out {} package(s)", count);
  Ok(())
}

fn short(commit: &str) -> &str {
  &commit[..12.min(commit.len())]
}
