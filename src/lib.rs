//! repoman - check out and release multi-repository package workspaces
//!
//! A workspace is a directory of independently versioned git repositories,
//! one per package, assembled from a package list (`packageList.txt`).
//! The library provides the manifest model, the checkout engine and the
//! two-phase release coordinator; the `repoman` binary is a thin CLI on top.

pub mod commands;
pub mod core;
pub mod manifest;
pub mod package;
pub mod release;
pub mod ui;
pub mod workspace;

pub use crate::core::context::RepomanContext;
pub use crate::core::error::{RepoError, RepoResult};
pub use manifest::{Manifest, PackageSpec};
pub use package::Package;
pub use workspace::{CheckoutOptions, Workspace};
