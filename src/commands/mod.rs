//! CLI commands for repoman
//!
//! ## Workspace
//! - **checkout**: check out a package and the packages it lists
//! - **checkout-list**: check out every package in a package list
//!
//! ## Releases
//! - **release-prepare**: compute the next version and record release intent
//! - **release-perform**: commit, tag and push a prepared release
//! - **release**: both phases in one go
//!
//! All commands accept `&RepomanContext`.

pub mod checkout;
pub mod release;

pub use checkout::{CheckoutArgs, CheckoutListArgs, run_checkout, run_checkout_list};
pub use release::{PerformArgs, PrepareArgs, ReleaseArgs, run_perform, run_prepare, run_release};
