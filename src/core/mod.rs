//! Core building blocks shared by the checkout engine and release coordinator
//!
//! - **config**: repoman.toml parsing and validation
//! - **context**: explicit workspace context threaded through every operation
//! - **error**: error taxonomy with exit codes and help messages
//! - **vcs**: version-control adapter contract and the system git backend

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
